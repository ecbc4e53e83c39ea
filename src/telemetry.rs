// Trade journal and status store fan-out; failures never stop trading
use crate::db::PostgresTradeJournal;
use crate::persistence::{RedisStatusStore, STATUS_HISTORY_HOURS};
use crate::scheduler::CycleReport;

/// Cycles between status history cleanups
const CLEANUP_EVERY_CYCLES: u64 = 60;

#[derive(Default)]
pub struct Telemetry {
    journal: Option<PostgresTradeJournal>,
    status_store: Option<RedisStatusStore>,
    published: u64,
}

impl Telemetry {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(
        journal: Option<PostgresTradeJournal>,
        status_store: Option<RedisStatusStore>,
    ) -> Self {
        Self {
            journal,
            status_store,
            published: 0,
        }
    }

    /// Connect whichever sinks are configured, continuing without any that fail
    pub async fn connect(
        database_url: Option<&str>,
        redis_url: Option<&str>,
        project_name: &str,
        pair: &str,
    ) -> Self {
        let journal = match database_url {
            Some(url) => match PostgresTradeJournal::new(url, project_name, pair).await {
                Ok(journal) => {
                    tracing::info!("Trade journal enabled for {}", project_name);
                    Some(journal)
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to connect to Postgres ({}), continuing without trade journal",
                        e
                    );
                    None
                }
            },
            None => None,
        };

        let status_store = match redis_url {
            Some(url) => match RedisStatusStore::new(url).await {
                Ok(store) => Some(store),
                Err(e) => {
                    tracing::warn!(
                        "Failed to connect to Redis ({}), continuing without status store",
                        e
                    );
                    None
                }
            },
            None => None,
        };

        Self::new(journal, status_store)
    }

    pub fn journal(&self) -> Option<&PostgresTradeJournal> {
        self.journal.as_ref()
    }

    pub async fn publish(&mut self, report: &CycleReport) {
        self.published += 1;

        if let (Some(journal), Some(event)) = (&self.journal, &report.trade_event) {
            if let Err(e) = journal.save_trade_event(event).await {
                tracing::warn!("  ✗ Failed to save trade event to Postgres: {}", e);
            }
        }

        if let Some(store) = self.status_store.as_mut() {
            if let Err(e) = store.save_status(&report.status).await {
                tracing::warn!("  ✗ Failed to save status to Redis: {}", e);
            }

            if self.published % CLEANUP_EVERY_CYCLES == 0 {
                if let Err(e) = store
                    .cleanup_old(&report.status.pair, STATUS_HISTORY_HOURS)
                    .await
                {
                    tracing::warn!("  ✗ Failed to clean up status history: {}", e);
                }
            }
        }
    }
}

use crate::models::StatusSnapshot;
use crate::Result;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::time::{timeout, Duration};

/// Hours of status history kept in the sorted set
pub const STATUS_HISTORY_HOURS: u64 = 24;

fn status_key(pair: &str) -> String {
    format!("status:{}", pair)
}

fn history_key(pair: &str) -> String {
    format!("status_history:{}", pair)
}

/// Redis store for per-cycle status snapshots
///
/// The latest snapshot lives at `status:{pair}`; the history is a sorted set
/// `status_history:{pair}` scored by timestamp.
pub struct RedisStatusStore {
    conn: ConnectionManager,
}

impl RedisStatusStore {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;

        // Add 5 second timeout to connection attempt
        let conn = timeout(Duration::from_secs(5), ConnectionManager::new(client))
            .await
            .map_err(|_| "Redis connection timeout after 5 seconds")??;

        tracing::info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    pub async fn save_status(&mut self, snapshot: &StatusSnapshot) -> Result<()> {
        let value = serde_json::to_string(snapshot)?;
        let score = snapshot.timestamp.timestamp() as f64;

        self.conn
            .set::<_, _, ()>(status_key(&snapshot.pair), &value)
            .await?;
        self.conn
            .zadd::<_, _, _, ()>(history_key(&snapshot.pair), &value, score)
            .await?;

        tracing::debug!("Saved status for {} to Redis", snapshot.pair);
        Ok(())
    }

    /// Drop history older than `keep_hours`
    pub async fn cleanup_old(&mut self, pair: &str, keep_hours: u64) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::hours(keep_hours as i64);
        let max_score = cutoff.timestamp() as f64;

        let removed: usize = self
            .conn
            .zrembyscore(history_key(pair), "-inf", max_score)
            .await?;

        if removed > 0 {
            tracing::debug!("Cleaned up {} old status snapshots for {}", removed, pair);
        }

        Ok(removed)
    }
}

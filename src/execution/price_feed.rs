use std::time::Duration;

use super::CandleAggregator;
use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::models::{Candle, Tick};
use crate::scheduler::{Clock, ShutdownSignal};

/// Polls the last traded price once per tick period and folds the samples
/// into candles
pub struct PriceFeed {
    aggregator: CandleAggregator,
    tick_period: Duration,
}

impl PriceFeed {
    pub fn new(interval: usize, tick_period: Duration) -> Self {
        Self {
            aggregator: CandleAggregator::new(interval),
            tick_period,
        }
    }

    /// Collect samples until one candle completes
    ///
    /// Transient failures are logged and retried after one tick period; they
    /// never count as a sample. Returns `Ok(None)` when shutdown is requested,
    /// which is only observed between ticks.
    pub async fn next_candle<E, C>(
        &mut self,
        exchange: &mut E,
        clock: &C,
        shutdown: &mut ShutdownSignal,
    ) -> Result<Option<Candle>, ExchangeError>
    where
        E: Exchange,
        C: Clock,
    {
        loop {
            if shutdown.is_triggered() {
                return Ok(None);
            }

            match exchange.get_last_price().await {
                Ok(price) => {
                    let completed = self.aggregator.observe(Tick::new(price, clock.now()));
                    tracing::debug!(
                        price,
                        sample = self.aggregator.samples(),
                        interval = self.aggregator.interval(),
                        "Tick"
                    );

                    let stopped = shutdown.sleep(clock, self.tick_period).await;
                    if let Some(candle) = completed {
                        return Ok(Some(candle));
                    }
                    if stopped {
                        return Ok(None);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "⚠️  Price fetch failed, retrying next tick");
                    if shutdown.sleep(clock, self.tick_period).await {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Drop any partially collected candle
    pub fn reset(&mut self) {
        self.aggregator.reset();
    }

    pub fn interval(&self) -> usize {
        self.aggregator.interval()
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }
}

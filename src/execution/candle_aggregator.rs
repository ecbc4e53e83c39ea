use chrono::{DateTime, Utc};

use crate::models::{Candle, Tick};

/// Folds a tick stream into fixed-sample-count OHLC candles
///
/// The first tick of an interval sets open/high/low, every tick updates
/// high/low/close, and the `interval`-th tick completes the candle. The next
/// tick after a completed candle opens a fresh one.
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    interval: usize,
    samples: usize,
    opened_at: Option<DateTime<Utc>>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl CandleAggregator {
    /// # Arguments
    /// * `interval` - Number of ticks per candle (at least 1)
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            samples: 0,
            opened_at: None,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
        }
    }

    /// Consume one tick, returning the candle it completes
    pub fn observe(&mut self, tick: Tick) -> Option<Candle> {
        let price = tick.price;

        if self.samples == 0 {
            self.opened_at = Some(tick.at);
            self.open = price;
            self.high = price;
            self.low = price;
        } else {
            self.high = self.high.max(price);
            self.low = self.low.min(price);
        }
        self.close = price;
        self.samples += 1;

        if self.samples < self.interval {
            return None;
        }

        let candle = Candle {
            timestamp: self.opened_at.unwrap_or(tick.at),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        };
        self.reset();
        Some(candle)
    }

    /// Drop the in-progress candle
    pub fn reset(&mut self) {
        self.samples = 0;
        self.opened_at = None;
    }

    /// Ticks consumed by the in-progress candle
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn feed(aggregator: &mut CandleAggregator, prices: &[f64]) -> Vec<Candle> {
        let start = Utc::now();
        prices
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| {
                aggregator.observe(Tick::new(p, start + Duration::seconds(i as i64)))
            })
            .collect()
    }

    #[test]
    fn test_emits_on_interval_boundary() {
        let mut aggregator = CandleAggregator::new(4);
        let start = Utc::now();

        assert!(aggregator.observe(Tick::new(100.0, start)).is_none());
        assert!(aggregator.observe(Tick::new(105.0, start)).is_none());
        assert!(aggregator.observe(Tick::new(95.0, start)).is_none());
        assert_eq!(aggregator.samples(), 3);

        let candle = aggregator.observe(Tick::new(101.0, start)).unwrap();
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.high, 105.0);
        assert_eq!(candle.low, 95.0);
        assert_eq!(candle.close, 101.0);
        assert_eq!(aggregator.samples(), 0);
    }

    #[test]
    fn test_next_tick_opens_new_candle() {
        let mut aggregator = CandleAggregator::new(3);
        let candles = feed(&mut aggregator, &[10.0, 12.0, 11.0, 20.0, 19.0, 21.0]);

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, 10.0);
        assert_eq!(candles[1].open, 20.0);
        assert_eq!(candles[1].low, 19.0);
        assert_eq!(candles[1].close, 21.0);
        assert!(candles[1].timestamp > candles[0].timestamp);
    }

    #[test]
    fn test_single_sample_interval() {
        let mut aggregator = CandleAggregator::new(1);
        let candles = feed(&mut aggregator, &[7.0, 8.0]);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].open, 8.0);
        assert_eq!(candles[1].close, 8.0);
    }

    #[test]
    fn test_ohlc_invariant_holds() {
        let mut aggregator = CandleAggregator::new(60);
        let prices: Vec<f64> = (0..600)
            .map(|i| 1000.0 + ((i * 37) % 101) as f64 - 50.0)
            .collect();

        let candles = feed(&mut aggregator, &prices);
        assert_eq!(candles.len(), 10);
        for c in candles {
            assert!(c.low <= c.open && c.open <= c.high);
            assert!(c.low <= c.close && c.close <= c.high);
        }
    }

    #[test]
    fn test_reset_discards_partial_candle() {
        let mut aggregator = CandleAggregator::new(2);
        let start = Utc::now();
        aggregator.observe(Tick::new(1.0, start));
        aggregator.reset();
        assert!(aggregator.observe(Tick::new(5.0, start)).is_none());
        let candle = aggregator.observe(Tick::new(6.0, start)).unwrap();
        assert_eq!(candle.open, 5.0);
    }
}

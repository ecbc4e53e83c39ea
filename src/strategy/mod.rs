// Signal engine module
pub mod signals;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{Candle, SignalResult};

pub use signals::SignalConfig;

/// Base trait for signal generators
pub trait Strategy: Send + Sync {
    /// Compute buy/sell flags from a most-recent-last candle series
    fn generate_signal(&self, candles: &[Candle]) -> SignalResult;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum candles required before any flag can be raised
    fn min_candles_required(&self) -> usize;
}

/// Signal algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    /// Down→up / up→down reversal over the last three closes
    Difference,
    BollingerBands,
    Macd,
    Rsi,
    /// Bollinger entries, MACD exits
    Hybrid,
    /// Majority vote of bollinger, macd and rsi
    Mix,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Difference,
        Algorithm::BollingerBands,
        Algorithm::Macd,
        Algorithm::Rsi,
        Algorithm::Hybrid,
        Algorithm::Mix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Difference => "DIFFERENCE",
            Algorithm::BollingerBands => "BOLLINGER_BANDS",
            Algorithm::Macd => "MACD",
            Algorithm::Rsi => "RSI",
            Algorithm::Hybrid => "HYBRID",
            Algorithm::Mix => "MIX",
        }
    }

    /// Candles needed before this algorithm can raise a flag
    pub fn lookback(&self, config: &SignalConfig) -> usize {
        match self {
            Algorithm::Difference => 3,
            Algorithm::BollingerBands => config.bollinger_period,
            Algorithm::Macd | Algorithm::Hybrid => config.macd_slow,
            Algorithm::Rsi => config.rsi_period + 1,
            Algorithm::Mix => config
                .bollinger_period
                .max(config.macd_slow)
                .max(config.rsi_period + 1),
        }
    }

    /// Default rolling series capacity for this algorithm
    pub fn default_capacity(&self, config: &SignalConfig) -> usize {
        match self {
            Algorithm::Difference => 3,
            _ => self.lookback(config).max(26),
        }
    }

    /// Evaluate this algorithm against a candle series
    ///
    /// Returns no flags while the series is shorter than the lookback.
    pub fn evaluate(&self, candles: &[Candle], config: &SignalConfig) -> SignalResult {
        if candles.len() < self.lookback(config) {
            return SignalResult::NONE;
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        match self {
            Algorithm::Difference => signals::difference(&closes),
            Algorithm::BollingerBands => signals::bollinger_bands(&closes, config),
            Algorithm::Macd => signals::macd(&closes, config),
            Algorithm::Rsi => signals::rsi(&closes, config),
            Algorithm::Hybrid => SignalResult::new(
                signals::bollinger_bands(&closes, config).buy,
                signals::macd(&closes, config).sell,
            ),
            Algorithm::Mix => signals::majority(&[
                signals::bollinger_bands(&closes, config),
                signals::macd(&closes, config),
                signals::rsi(&closes, config),
            ]),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| ConfigError::InvalidAlgorithm(s.to_string()))
    }
}

/// The configured signal engine: one algorithm plus its parameters
#[derive(Debug, Clone)]
pub struct SignalEngine {
    algorithm: Algorithm,
    config: SignalConfig,
}

impl SignalEngine {
    pub fn new(algorithm: Algorithm) -> Self {
        Self::with_config(algorithm, SignalConfig::default())
    }

    pub fn with_config(algorithm: Algorithm, config: SignalConfig) -> Self {
        Self { algorithm, config }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }
}

impl Strategy for SignalEngine {
    fn generate_signal(&self, candles: &[Candle]) -> SignalResult {
        let result = self.algorithm.evaluate(candles, &self.config);
        tracing::debug!(
            algorithm = %self.algorithm,
            candles = candles.len(),
            buy = result.buy,
            sell = result.sell,
            "Evaluated signal"
        );
        result
    }

    fn name(&self) -> &str {
        self.algorithm.as_str()
    }

    fn min_candles_required(&self) -> usize {
        self.algorithm.lookback(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candles_from(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .map(|&c| Candle {
                timestamp: Utc::now(),
                open: c,
                high: c,
                low: c,
                close: c,
            })
            .collect()
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("DIFFERENCE".parse::<Algorithm>().unwrap(), Algorithm::Difference);
        assert_eq!(
            "bollinger_bands".parse::<Algorithm>().unwrap(),
            Algorithm::BollingerBands
        );
        assert_eq!(" mix ".parse::<Algorithm>().unwrap(), Algorithm::Mix);
        assert!("ICHIMOKU".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_lookbacks() {
        let config = SignalConfig::default();
        assert_eq!(Algorithm::Difference.lookback(&config), 3);
        assert_eq!(Algorithm::BollingerBands.lookback(&config), 20);
        assert_eq!(Algorithm::Rsi.lookback(&config), 15);
        assert_eq!(Algorithm::Macd.lookback(&config), 26);
        assert_eq!(Algorithm::Mix.lookback(&config), 26);
        assert_eq!(Algorithm::Difference.default_capacity(&config), 3);
        assert_eq!(Algorithm::Rsi.default_capacity(&config), 26);
    }

    #[test]
    fn test_insufficient_series_gives_no_signal() {
        let config = SignalConfig::default();
        for algorithm in Algorithm::ALL {
            let candles = candles_from(&[100.0, 98.0]);
            assert_eq!(algorithm.evaluate(&candles, &config), SignalResult::NONE);
        }
    }

    #[test]
    fn test_difference_end_to_end_window() {
        let engine = SignalEngine::new(Algorithm::Difference);
        let closes = [100.0, 98.0, 96.0, 99.0, 103.0];

        // Sliding three-candle windows, most recent last
        let results: Vec<SignalResult> = (3..=closes.len())
            .map(|end| engine.generate_signal(&candles_from(&closes[end - 3..end])))
            .collect();

        assert_eq!(results[0], SignalResult::NONE); // 100, 98, 96
        assert_eq!(results[1], SignalResult::new(true, false)); // 98, 96, 99
        assert_eq!(results[2], SignalResult::NONE); // 96, 99, 103
    }

    #[test]
    fn test_hybrid_combines_bollinger_buy_and_macd_sell() {
        let config = SignalConfig::default();
        let mut closes = vec![100.0; 25];
        closes.push(80.0);
        let candles = candles_from(&closes);

        let hybrid = Algorithm::Hybrid.evaluate(&candles, &config);
        let bollinger = Algorithm::BollingerBands.evaluate(&candles, &config);
        let macd = Algorithm::Macd.evaluate(&candles, &config);

        assert!(hybrid.buy);
        assert_eq!(hybrid.buy, bollinger.buy);
        assert_eq!(hybrid.sell, macd.sell);
    }

    #[test]
    fn test_mix_follows_two_of_three() {
        let config = SignalConfig::default();
        let vote = |closes: &[f64]| {
            let candles = candles_from(closes);
            (
                Algorithm::BollingerBands.evaluate(&candles, &config),
                Algorithm::Macd.evaluate(&candles, &config),
                Algorithm::Rsi.evaluate(&candles, &config),
                Algorithm::Mix.evaluate(&candles, &config),
            )
        };

        // Flat then a crash: bollinger and rsi buy, the histogram only just turns
        let mut crash = vec![100.0; 25];
        crash.push(80.0);
        let (bollinger, macd, rsi, mix) = vote(&crash);
        assert_eq!(bollinger, SignalResult::new(true, false));
        assert_eq!(macd, SignalResult::NONE);
        assert_eq!(rsi, SignalResult::new(true, false));
        assert_eq!(mix, SignalResult::new(true, false));

        // Flat then a spike: bollinger and rsi sell
        let mut spike = vec![100.0; 25];
        spike.push(120.0);
        let (bollinger, macd, rsi, mix) = vote(&spike);
        assert_eq!(bollinger, SignalResult::new(false, true));
        assert_eq!(macd, SignalResult::NONE);
        assert_eq!(rsi, SignalResult::new(false, true));
        assert_eq!(mix, SignalResult::new(false, true));

        // Steady decline stays inside the bands: only rsi buys, no majority
        let decline: Vec<f64> = (0..26).map(|i| 100.0 - 0.1 * i as f64).collect();
        let (bollinger, macd, rsi, mix) = vote(&decline);
        assert_eq!(bollinger, SignalResult::NONE);
        assert!(!macd.buy);
        assert_eq!(rsi, SignalResult::new(true, false));
        assert_eq!(mix, SignalResult::NONE);
    }

    #[test]
    fn test_engine_reports_name() {
        let engine = SignalEngine::new(Algorithm::Rsi);
        assert_eq!(engine.name(), "RSI");
        assert_eq!(engine.min_candles_required(), 15);
    }
}

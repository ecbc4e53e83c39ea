// Technical indicators module
// Shared primitives for the signal engine: SMA, σ, EMA, MACD, RSI, Bollinger Bands

pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use bollinger::{calculate_bollinger, BollingerBands};
pub use macd::macd_histogram;
pub use moving_average::{calculate_ema, calculate_sma, calculate_std_dev, ema_series};
pub use rsi::calculate_rsi;

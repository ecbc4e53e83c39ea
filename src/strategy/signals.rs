use crate::indicators::{calculate_bollinger, calculate_rsi, macd_histogram};
use crate::models::SignalResult;

/// Parameters shared by the signal rules
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub bollinger_period: usize,
    pub bollinger_num_std: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            bollinger_period: 20,
            bollinger_num_std: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
        }
    }
}

/// Reversal over the last three closes
///
/// Buy on down→up (`c[-3] > c[-2] < c[-1]`), sell on up→down.
pub fn difference(closes: &[f64]) -> SignalResult {
    let [.., a, b, c] = closes else {
        return SignalResult::NONE;
    };

    SignalResult::new(a > b && b < c, a < b && b > c)
}

/// Latest close outside SMA ± k·σ
pub fn bollinger_bands(closes: &[f64], config: &SignalConfig) -> SignalResult {
    let Some(bands) =
        calculate_bollinger(closes, config.bollinger_period, config.bollinger_num_std)
    else {
        return SignalResult::NONE;
    };
    let Some(&close) = closes.last() else {
        return SignalResult::NONE;
    };

    tracing::debug!(
        close,
        lower = bands.lower,
        middle = bands.middle,
        upper = bands.upper,
        "Bollinger bands"
    );

    SignalResult::new(close < bands.lower, close > bands.upper)
}

/// Histogram crossing above zero buys; a shrinking positive histogram sells
pub fn macd(closes: &[f64], config: &SignalConfig) -> SignalResult {
    let histogram = macd_histogram(
        closes,
        config.macd_fast,
        config.macd_slow,
        config.macd_signal,
    );
    let [.., prev, last] = histogram.as_slice() else {
        return SignalResult::NONE;
    };

    tracing::debug!(prev, last, "MACD histogram");

    SignalResult::new(*prev < 0.0 && *last > 0.0, *prev > 0.0 && prev > last)
}

/// Inclusive oversold/overbought thresholds on RSI
pub fn rsi(closes: &[f64], config: &SignalConfig) -> SignalResult {
    let Some(value) = calculate_rsi(closes, config.rsi_period) else {
        return SignalResult::NONE;
    };

    tracing::debug!(rsi = value, "RSI");

    SignalResult::new(value <= config.rsi_oversold, value >= config.rsi_overbought)
}

/// Per-flag majority vote across sub-signals
pub fn majority(results: &[SignalResult]) -> SignalResult {
    let needed = results.len() / 2 + 1;
    let buys = results.iter().filter(|r| r.buy).count();
    let sells = results.iter().filter(|r| r.sell).count();

    SignalResult::new(buys >= needed, sells >= needed)
}

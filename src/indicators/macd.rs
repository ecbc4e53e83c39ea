use super::moving_average::ema_series;

/// MACD histogram series: `(EMA_fast - EMA_slow) - EMA_signal(EMA_fast - EMA_slow)`
///
/// One value per input price.
pub fn macd_histogram(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
    let ema_fast = ema_series(prices, fast);
    let ema_slow = ema_series(prices, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_series(&macd_line, signal);

    macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect()
}

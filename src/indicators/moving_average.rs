/// Calculate Simple Moving Average (SMA) over the trailing `period` values
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Calculate the sample standard deviation (n - 1 denominator) over the
/// trailing `period` values
pub fn calculate_std_dev(prices: &[f64], period: usize) -> Option<f64> {
    if period < 2 || prices.len() < period {
        return None;
    }

    let mean = calculate_sma(prices, period)?;
    let sum_sq: f64 = prices
        .iter()
        .rev()
        .take(period)
        .map(|p| (p - mean).powi(2))
        .sum();

    Some((sum_sq / (period - 1) as f64).sqrt())
}

/// Exponential Moving Average series with smoothing factor `2 / (span + 1)`
///
/// Seeded from the first value, so the output has the same length as the input.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());

    let mut iter = values.iter();
    let Some(&first) = iter.next() else {
        return out;
    };

    let mut ema = first;
    out.push(ema);
    for value in iter {
        ema = alpha * value + (1.0 - alpha) * ema;
        out.push(ema);
    }

    out
}

/// Latest EMA value of `prices`
pub fn calculate_ema(prices: &[f64], span: usize) -> Option<f64> {
    ema_series(prices, span).last().copied()
}

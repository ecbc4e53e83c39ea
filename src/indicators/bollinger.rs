use super::moving_average::{calculate_sma, calculate_std_dev};

/// Bollinger Bands over the trailing window: SMA ± `num_std` sample σ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub fn calculate_bollinger(prices: &[f64], period: usize, num_std: f64) -> Option<BollingerBands> {
    let middle = calculate_sma(prices, period)?;
    let std = calculate_std_dev(prices, period)?;

    Some(BollingerBands {
        upper: middle + num_std * std,
        middle,
        lower: middle - num_std * std,
    })
}

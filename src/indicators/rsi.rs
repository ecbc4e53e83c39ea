/// Calculate Relative Strength Index (RSI)
///
/// Uses simple averages of gains and absolute losses over the trailing
/// `period` close-to-close differences:
/// `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`.
///
/// Values:
/// - RSI >= 70: Overbought
/// - RSI <= 30: Oversold
///
/// Returns `None` with fewer than `period + 1` prices, or when every
/// difference in the window is zero.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - (period + 1)..];

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum += change.abs();
        }
    }

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    if avg_gain == 0.0 && avg_loss == 0.0 {
        return None;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_rsi_calculation() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5, 46.0, 46.5, 46.25,
            46.0, 46.5,
        ];

        let rsi = calculate_rsi(&prices, 14).unwrap();
        // gains 4.0, losses 1.5 over 14 differences
        let expected = 100.0 - 100.0 / (1.0 + 4.0 / 1.5);
        assert!((rsi - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![100.0, 102.0, 101.0];
        let rsi = calculate_rsi(&prices, 14);
        assert!(rsi.is_none());
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices = vec![100.0, 101.0, 101.0, 103.0, 104.0, 105.0];
        assert_eq!(calculate_rsi(&prices, 5), Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses() {
        let prices = vec![105.0, 104.0, 104.0, 102.0, 101.0, 100.0];
        assert_eq!(calculate_rsi(&prices, 5), Some(0.0));
    }

    #[test]
    fn test_rsi_flat_window_has_no_value() {
        let prices = vec![100.0; 15];
        assert_eq!(calculate_rsi(&prices, 14), None);
    }

    #[test]
    fn test_rsi_only_uses_trailing_window() {
        // A huge drop outside the window must not matter
        let mut prices = vec![1000.0, 10.0];
        prices.extend((0..14).map(|i| 10.0 + i as f64));
        assert_eq!(calculate_rsi(&prices, 14), Some(100.0));
    }

    #[test]
    fn test_rsi_always_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let len = rng.gen_range(15..40);
            let prices: Vec<f64> = (0..len).map(|_| rng.gen_range(90.0..110.0)).collect();
            if let Some(rsi) = calculate_rsi(&prices, 14) {
                assert!((0.0..=100.0).contains(&rsi), "rsi out of range: {}", rsi);
            }
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::strategy::Algorithm;

/// A single last-traded price sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub price: f64,
    pub at: DateTime<Utc>,
}

impl Tick {
    pub fn new(price: f64, at: DateTime<Utc>) -> Self {
        Self { price, at }
    }
}

/// OHLC candle over one fixed sample interval
///
/// `timestamp` is the time of the first sample in the interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Buy/sell flags produced by the signal engine for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResult {
    pub buy: bool,
    pub sell: bool,
}

impl SignalResult {
    pub const NONE: SignalResult = SignalResult {
        buy: false,
        sell: false,
    };

    pub fn new(buy: bool, sell: bool) -> Self {
        Self { buy, sell }
    }

    pub fn is_none(&self) -> bool {
        !self.buy && !self.sell
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// What a rate quote is sized by
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateAmount {
    /// Quantity of the traded asset (e.g. 0.005 BTC)
    Asset(f64),
    /// Amount of quote currency (e.g. 10000 JPY)
    Currency(f64),
}

/// Exchange rate quote for a hypothetical market order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Price per unit of asset
    pub rate: f64,
    /// Total currency value of the quoted order
    pub price: f64,
    /// Asset quantity of the quoted order
    pub amount: f64,
}

/// Accepted market buy
#[derive(Debug, Clone, PartialEq)]
pub struct BuyFill {
    pub order_id: String,
    pub filled_asset_amount: f64,
    pub cost_amount: f64,
}

/// Accepted market sell
#[derive(Debug, Clone, PartialEq)]
pub struct SellFill {
    pub order_id: String,
    pub sold_asset_amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: f64,
    pub asset: f64,
}

/// The single open position held by the order lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub order_id: String,
    /// Currency spent on entry
    pub entry_amount: f64,
    pub acquired_asset_amount: f64,
    pub opened_at: DateTime<Utc>,
}

/// Per-cycle status for logs and telemetry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub pair: String,
    pub algorithm: Algorithm,
    pub cumulative_profit: f64,
    pub position: Option<Position>,
    pub last_close: f64,
    pub balance: Option<Balance>,
    pub loss_streak: u32,
    pub paused_until: Option<DateTime<Utc>>,
}

/// Per-trade record handed to the trade journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub timestamp: DateTime<Utc>,
    pub algorithm: Algorithm,
    pub profit_delta: f64,
    pub close_price: f64,
    pub did_buy: bool,
    pub did_sell: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_result_none() {
        assert!(SignalResult::NONE.is_none());
        assert!(!SignalResult::new(true, false).is_none());
        assert_eq!(SignalResult::default(), SignalResult::NONE);
    }

    #[test]
    fn test_side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"sell\"");
        assert_eq!(Side::Buy.as_str(), "buy");
    }

    #[test]
    fn test_status_snapshot_serializes_position() {
        let snapshot = StatusSnapshot {
            timestamp: Utc::now(),
            pair: "btc_jpy".to_string(),
            algorithm: Algorithm::Macd,
            cumulative_profit: 120.0,
            position: Some(Position {
                order_id: "42".to_string(),
                entry_amount: 10000.0,
                acquired_asset_amount: 0.002,
                opened_at: Utc::now(),
            }),
            last_close: 5_000_000.0,
            balance: None,
            loss_streak: 0,
            paused_until: None,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["algorithm"], "MACD");
        assert_eq!(json["position"]["order_id"], "42");
        assert_eq!(json["cumulative_profit"], 120.0);
    }
}

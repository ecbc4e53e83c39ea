// Exchange boundary: the exact capability set the trading core consumes
pub mod simulated;

pub use simulated::SimulatedExchange;

use crate::error::ExchangeError;
use crate::models::{Balance, BuyFill, Quote, RateAmount, SellFill, Side};

/// Spot exchange for a single trading pair
///
/// Implementations own any retry policy for transient faults; callers treat
/// `Rejected` as a business refusal and `Fatal` as unrecoverable.
#[allow(async_fn_in_trait)]
pub trait Exchange {
    /// Last traded price of the pair
    async fn get_last_price(&mut self) -> Result<f64, ExchangeError>;

    /// Market buy spending `currency_amount` of the quote currency
    async fn place_market_buy(&mut self, currency_amount: f64) -> Result<BuyFill, ExchangeError>;

    /// Market sell of `asset_amount` of the traded asset
    async fn place_market_sell(&mut self, asset_amount: f64) -> Result<SellFill, ExchangeError>;

    /// Quote for a hypothetical market order
    async fn get_rate(&self, side: Side, amount: RateAmount) -> Result<Quote, ExchangeError>;

    async fn get_balance(&self) -> Result<Balance, ExchangeError>;
}

use uuid::Uuid;

use super::Exchange;
use crate::error::ExchangeError;
use crate::models::{Balance, BuyFill, Quote, RateAmount, SellFill, Side};

/// Starting virtual balance for paper trading, in quote currency
pub const DEFAULT_SIMULATION_CURRENCY: f64 = 100_000.0;

const DUST: f64 = 1e-12;

/// Paper-trading book on top of a real (or synthetic) market
///
/// Prices and quotes come from `market`; orders only move virtual balances.
pub struct SimulatedExchange<M> {
    market: M,
    balance: Balance,
}

impl<M: Exchange> SimulatedExchange<M> {
    pub fn new(market: M) -> Self {
        Self::with_balance(
            market,
            Balance {
                currency: DEFAULT_SIMULATION_CURRENCY,
                asset: 0.0,
            },
        )
    }

    pub fn with_balance(market: M, balance: Balance) -> Self {
        Self { market, balance }
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    fn order_id() -> String {
        format!("simulation-{}", Uuid::new_v4())
    }
}

impl<M: Exchange> Exchange for SimulatedExchange<M> {
    async fn get_last_price(&mut self) -> Result<f64, ExchangeError> {
        self.market.get_last_price().await
    }

    async fn place_market_buy(&mut self, currency_amount: f64) -> Result<BuyFill, ExchangeError> {
        if currency_amount <= 0.0 {
            return Err(ExchangeError::Rejected(format!(
                "invalid buy amount {}",
                currency_amount
            )));
        }
        if currency_amount > self.balance.currency + DUST {
            return Err(ExchangeError::Rejected(format!(
                "insufficient funds: need {:.2}, have {:.2}",
                currency_amount, self.balance.currency
            )));
        }

        let quote = self
            .market
            .get_rate(Side::Buy, RateAmount::Currency(currency_amount))
            .await?;

        self.balance.currency -= currency_amount;
        self.balance.asset += quote.amount;

        tracing::debug!(
            spent = currency_amount,
            acquired = quote.amount,
            rate = quote.rate,
            "Simulated market buy"
        );

        Ok(BuyFill {
            order_id: Self::order_id(),
            filled_asset_amount: quote.amount,
            cost_amount: currency_amount,
        })
    }

    async fn place_market_sell(&mut self, asset_amount: f64) -> Result<SellFill, ExchangeError> {
        if asset_amount <= 0.0 {
            return Err(ExchangeError::Rejected(format!(
                "invalid sell amount {}",
                asset_amount
            )));
        }
        if asset_amount > self.balance.asset + DUST {
            return Err(ExchangeError::Rejected(format!(
                "insufficient asset: need {}, have {}",
                asset_amount, self.balance.asset
            )));
        }

        let quote = self
            .market
            .get_rate(Side::Sell, RateAmount::Asset(asset_amount))
            .await?;

        self.balance.asset = (self.balance.asset - asset_amount).max(0.0);
        self.balance.currency += quote.price;

        tracing::debug!(
            sold = asset_amount,
            proceeds = quote.price,
            rate = quote.rate,
            "Simulated market sell"
        );

        Ok(SellFill {
            order_id: Self::order_id(),
            sold_asset_amount: asset_amount,
        })
    }

    async fn get_rate(&self, side: Side, amount: RateAmount) -> Result<Quote, ExchangeError> {
        self.market.get_rate(side, amount).await
    }

    async fn get_balance(&self) -> Result<Balance, ExchangeError> {
        Ok(self.balance)
    }
}

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::models::{Balance, BuyFill, Quote, RateAmount, SellFill, Side};

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MarketScenario {
    /// Steady uptrend with small noise
    Uptrend,
    /// Steady downtrend with small noise
    Downtrend,
    /// Mean-reverting chop around the base price
    Sideways,
    /// Large random swings
    Volatile,
    /// Slow climb, then a sustained slide to exercise the circuit breaker
    DrawdownTest,
}

/// Ticks of normal trading before `DrawdownTest` starts sliding
const DRAWDOWN_AFTER_TICKS: u64 = 3_000;

pub const DEFAULT_BASE_PRICE: f64 = 5_000_000.0;

enum PriceSource {
    /// Fixed path, repeating its last price once exhausted
    Scripted { prices: Vec<f64>, next: usize },
    RandomWalk {
        rng: StdRng,
        scenario: MarketScenario,
        base_price: f64,
        ticks: u64,
    },
}

/// Offline price source: a seeded random walk or a scripted path
///
/// Quotes fill at the current price with no spread. It has no account, so
/// orders are rejected; wrap it in `SimulatedExchange` to trade against it.
pub struct SyntheticMarket {
    source: PriceSource,
    price: f64,
}

impl SyntheticMarket {
    pub fn random_walk(scenario: MarketScenario, seed: u64) -> Self {
        Self::random_walk_from(scenario, seed, DEFAULT_BASE_PRICE)
    }

    pub fn random_walk_from(scenario: MarketScenario, seed: u64, base_price: f64) -> Self {
        Self {
            source: PriceSource::RandomWalk {
                rng: StdRng::seed_from_u64(seed),
                scenario,
                base_price,
                ticks: 0,
            },
            price: base_price,
        }
    }

    /// Replay `prices` one per request, then hold the last one
    pub fn scripted(prices: Vec<f64>) -> Self {
        let price = prices.first().copied().unwrap_or(0.0);
        Self {
            source: PriceSource::Scripted { prices, next: 0 },
            price,
        }
    }

    /// Price that quotes are currently filled at
    pub fn current_price(&self) -> f64 {
        self.price
    }

    fn advance(&mut self) -> f64 {
        match &mut self.source {
            PriceSource::Scripted { prices, next } => {
                if let Some(&price) = prices.get(*next) {
                    self.price = price;
                    *next += 1;
                }
            }
            PriceSource::RandomWalk {
                rng,
                scenario,
                base_price,
                ticks,
            } => {
                let current = self.price;
                let change = match scenario {
                    MarketScenario::Uptrend => {
                        current * (0.00005 + rng.gen_range(-0.0005..0.0005))
                    }
                    MarketScenario::Downtrend => {
                        current * (-0.00005 + rng.gen_range(-0.0005..0.0005))
                    }
                    MarketScenario::Sideways => {
                        // 5% pull to mean
                        (*base_price - current) * 0.05 + current * rng.gen_range(-0.001..0.001)
                    }
                    MarketScenario::Volatile => current * rng.gen_range(-0.004..0.004),
                    MarketScenario::DrawdownTest if *ticks < DRAWDOWN_AFTER_TICKS => {
                        current * rng.gen_range(-0.0004..0.0005)
                    }
                    MarketScenario::DrawdownTest => {
                        current * (-0.0003 + rng.gen_range(-0.0005..0.0005))
                    }
                };
                *ticks += 1;

                // Prevent price from collapsing to zero
                self.price = (current + change).max(*base_price * 0.1);
            }
        }
        self.price
    }
}

impl Exchange for SyntheticMarket {
    async fn get_last_price(&mut self) -> Result<f64, ExchangeError> {
        Ok(self.advance())
    }

    async fn place_market_buy(&mut self, _currency_amount: f64) -> Result<BuyFill, ExchangeError> {
        Err(ExchangeError::Rejected(
            "synthetic market has no account".to_string(),
        ))
    }

    async fn place_market_sell(&mut self, _asset_amount: f64) -> Result<SellFill, ExchangeError> {
        Err(ExchangeError::Rejected(
            "synthetic market has no account".to_string(),
        ))
    }

    async fn get_rate(&self, _side: Side, amount: RateAmount) -> Result<Quote, ExchangeError> {
        let rate = self.price;
        if rate <= 0.0 {
            return Err(ExchangeError::Transient("no price yet".to_string()));
        }

        let quote = match amount {
            RateAmount::Asset(asset) => Quote {
                rate,
                price: asset * rate,
                amount: asset,
            },
            RateAmount::Currency(currency) => Quote {
                rate,
                price: currency,
                amount: currency / rate,
            },
        };
        Ok(quote)
    }

    async fn get_balance(&self) -> Result<Balance, ExchangeError> {
        Ok(Balance::default())
    }
}

pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use metrics::{BacktestMetrics, RunCounters, TradeRecord};
pub use runner::BacktestRunner;
pub use synthetic::{MarketScenario, SyntheticMarket};

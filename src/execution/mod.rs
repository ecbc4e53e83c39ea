// Order execution and data collection module
pub mod candle_aggregator;
pub mod executor;
pub mod order_lifecycle;
pub mod price_feed;
pub mod rolling_series;

pub use candle_aggregator::CandleAggregator;
pub use executor::{process_signal, ExecutionAction, ExecutionDecision};
pub use order_lifecycle::{
    ClosedTrade, LifecycleState, OrderLifecycle, TradeAmount, TransitionOutcome,
};
pub use price_feed::PriceFeed;
pub use rolling_series::RollingSeries;

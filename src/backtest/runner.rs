use crate::backtest::metrics::{BacktestMetrics, RunCounters, TradeRecord};
use crate::backtest::SyntheticMarket;
use crate::error::ExchangeError;
use crate::exchange::simulated::DEFAULT_SIMULATION_CURRENCY;
use crate::exchange::SimulatedExchange;
use crate::execution::TransitionOutcome;
use crate::models::Balance;
use crate::scheduler::{Scheduler, SchedulerConfig, ShutdownSignal, SimulatedClock};
use crate::telemetry::Telemetry;

/// Drives the real scheduler against a synthetic market on a virtual clock
pub struct BacktestRunner {
    config: SchedulerConfig,
    initial_currency: f64,
}

impl BacktestRunner {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            initial_currency: DEFAULT_SIMULATION_CURRENCY,
        }
    }

    pub fn with_initial_currency(mut self, initial_currency: f64) -> Self {
        self.initial_currency = initial_currency;
        self
    }

    /// Warm up, then run `cycles` trading cycles
    ///
    /// # Returns
    /// BacktestMetrics with performance data
    pub async fn run(
        &self,
        market: SyntheticMarket,
        cycles: usize,
    ) -> Result<BacktestMetrics, ExchangeError> {
        let exchange = SimulatedExchange::with_balance(
            market,
            Balance {
                currency: self.initial_currency,
                asset: 0.0,
            },
        );
        let mut scheduler = Scheduler::new(
            self.config.clone(),
            exchange,
            SimulatedClock::default(),
            ShutdownSignal::never(),
            Telemetry::disabled(),
        );

        tracing::info!(
            "Starting backtest: {} cycles of {} on {}",
            cycles,
            self.config.algorithm,
            self.config.pair
        );

        let mut trades = Vec::new();
        let mut counters = RunCounters::default();
        let mut last_close = scheduler.exchange().market().current_price();

        if scheduler.warm_up().await? {
            for _ in 0..cycles {
                let Some(report) = scheduler.run_cycle().await? else {
                    break;
                };
                counters.cycles += 1;
                last_close = report.candle.close;

                match &report.outcome {
                    Some(TransitionOutcome::Sold(trade)) => {
                        trades.push(TradeRecord::from_closed(trade))
                    }
                    Some(TransitionOutcome::Failed { side, reason }) => {
                        counters.failed_orders += 1;
                        tracing::debug!("{} failed: {}", side.as_str(), reason);
                    }
                    _ => {}
                }
                if report.breaker_trip.is_some() {
                    counters.circuit_breaker_hits += 1;
                }
            }
        }

        let balance = scheduler.exchange().balance();
        let final_equity = balance.currency + balance.asset * last_close;

        Ok(BacktestMetrics::from_trades(
            trades,
            self.initial_currency,
            final_equity,
            counters,
        ))
    }
}

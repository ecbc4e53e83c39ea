// Trading loop: warm-up, per-candle cycle and breaker cooldown
pub mod clock;
pub mod shutdown;

pub use clock::{Clock, SimulatedClock, SystemClock};
pub use shutdown::{channel, ShutdownHandle, ShutdownSignal};

use std::time::Duration;

use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::execution::{
    process_signal, ExecutionAction, ExecutionDecision, OrderLifecycle, PriceFeed, RollingSeries,
    TradeAmount, TransitionOutcome,
};
use crate::models::{Candle, SignalResult, StatusSnapshot, TradeEvent};
use crate::risk::{CircuitBreakerTrip, CircuitBreakers, DrawdownBreaker};
use crate::strategy::{Algorithm, SignalEngine, SignalConfig, Strategy};
use crate::telemetry::Telemetry;

/// Everything the loop needs that is not a collaborator
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub pair: String,
    pub algorithm: Algorithm,
    pub signal: SignalConfig,
    pub amount: TradeAmount,
    /// Ticks per candle
    pub interval: usize,
    pub tick_period: Duration,
    /// Candles kept for evaluation
    pub series_capacity: usize,
    pub breaker: CircuitBreakers,
    /// Cumulative profit carried over from an earlier run
    pub starting_profit: f64,
}

impl SchedulerConfig {
    pub fn new(pair: impl Into<String>, algorithm: Algorithm) -> Self {
        let signal = SignalConfig::default();
        Self {
            pair: pair.into(),
            algorithm,
            series_capacity: algorithm.default_capacity(&signal),
            signal,
            amount: TradeAmount::FullBalance,
            interval: 60,
            tick_period: Duration::from_secs(1),
            breaker: CircuitBreakers::default(),
            starting_profit: 0.0,
        }
    }
}

/// What one completed cycle did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub candle: Candle,
    pub signal: SignalResult,
    pub decision: ExecutionDecision,
    pub outcome: Option<TransitionOutcome>,
    pub breaker_trip: Option<CircuitBreakerTrip>,
    pub status: StatusSnapshot,
    /// Present when a buy or sell actually happened
    pub trade_event: Option<TradeEvent>,
}

/// Why `run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    CycleLimit,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cycles: usize,
    pub cumulative_profit: f64,
    pub completed_trades: usize,
    pub breaker_trips: usize,
    pub stop_reason: StopReason,
}

/// Owns all trading state; the only writer of series, lifecycle and breaker
pub struct Scheduler<E, C> {
    exchange: E,
    clock: C,
    shutdown: ShutdownSignal,
    telemetry: Telemetry,
    engine: SignalEngine,
    feed: PriceFeed,
    series: RollingSeries<Candle>,
    lifecycle: OrderLifecycle,
    breaker: DrawdownBreaker,
    pair: String,
    cycles: usize,
}

impl<E: Exchange, C: Clock> Scheduler<E, C> {
    pub fn new(
        config: SchedulerConfig,
        exchange: E,
        clock: C,
        shutdown: ShutdownSignal,
        telemetry: Telemetry,
    ) -> Self {
        let engine = SignalEngine::with_config(config.algorithm, config.signal.clone());
        Self {
            exchange,
            clock,
            shutdown,
            telemetry,
            engine,
            feed: PriceFeed::new(config.interval, config.tick_period),
            series: RollingSeries::new(config.series_capacity),
            lifecycle: OrderLifecycle::with_cumulative_profit(config.amount, config.starting_profit),
            breaker: DrawdownBreaker::with_baseline(config.breaker, config.starting_profit),
            pair: config.pair,
            cycles: 0,
        }
    }

    /// Warm up, then run cycles until shutdown
    pub async fn run(&mut self) -> Result<RunSummary, ExchangeError> {
        self.run_until(None).await
    }

    /// Like `run`, stopping after `max_cycles` cycles when given
    pub async fn run_until(
        &mut self,
        max_cycles: Option<usize>,
    ) -> Result<RunSummary, ExchangeError> {
        tracing::info!(
            "🚀 Trading {} with {} (series capacity {})",
            self.pair,
            self.engine.algorithm(),
            self.series.capacity()
        );

        let mut stop_reason = StopReason::Shutdown;
        if self.warm_up().await? {
            loop {
                if max_cycles.is_some_and(|max| self.cycles >= max) {
                    stop_reason = StopReason::CycleLimit;
                    break;
                }

                let Some(report) = self.run_cycle().await? else {
                    break;
                };
                self.telemetry.publish(&report).await;
            }
        }

        let summary = self.summary(stop_reason);
        tracing::info!(
            cycles = summary.cycles,
            cumulative_profit = summary.cumulative_profit,
            trades = summary.completed_trades,
            "🛑 Trading loop stopped ({:?})",
            summary.stop_reason
        );
        Ok(summary)
    }

    /// Fill the series up to one candle short of capacity
    ///
    /// Returns `false` if shutdown interrupted collection.
    pub async fn warm_up(&mut self) -> Result<bool, ExchangeError> {
        let target = self.series.capacity().saturating_sub(1);
        if self.series.len() >= target {
            return Ok(true);
        }

        tracing::info!("📊 Collecting {} candles before trading", target);
        while self.series.len() < target {
            let Some(candle) = self.next_candle().await? else {
                return Ok(false);
            };
            self.series.push(candle);
            tracing::info!("{}/{} candles collected", self.series.len(), target);
        }
        tracing::info!("✅ Warm-up complete");
        Ok(true)
    }

    /// Collect one candle, evaluate, and act on it
    ///
    /// Returns `Ok(None)` on shutdown. Only `Fatal` exchange errors escape.
    pub async fn run_cycle(&mut self) -> Result<Option<CycleReport>, ExchangeError> {
        if self.breaker.is_tripped() {
            if !self.cool_down().await {
                return Ok(None);
            }
            self.breaker.resume(self.lifecycle.cumulative_profit());
            self.series.clear();
            self.feed.reset();
            if !self.warm_up().await? {
                return Ok(None);
            }
        }

        let Some(candle) = self.next_candle().await? else {
            return Ok(None);
        };
        self.series.push(candle);

        let signal = self.engine.generate_signal(&self.series.to_vec());
        let now = self.clock.now();
        let decision = process_signal(signal, self.lifecycle.state(), self.breaker.is_paused(now));

        let outcome = match decision.action {
            ExecutionAction::Buy => Some(self.lifecycle.buy(&mut self.exchange, now).await?),
            ExecutionAction::Sell => Some(
                self.lifecycle
                    .sell(&mut self.exchange, now, candle.close)
                    .await?,
            ),
            ExecutionAction::Skip => {
                if signal.is_none() {
                    tracing::debug!(reason = %decision.reason, "Skip");
                } else {
                    tracing::info!("⏭️  {}", decision.reason);
                }
                None
            }
        };

        let breaker_trip = match &outcome {
            Some(TransitionOutcome::Sold(trade)) => self.breaker.record_trade(
                now,
                trade.profit,
                trade.position.entry_amount,
                self.lifecycle.cumulative_profit(),
            ),
            _ => None,
        };

        let trade_event = match &outcome {
            Some(TransitionOutcome::Bought(_)) => Some(self.trade_event(now, &candle, 0.0, true)),
            Some(TransitionOutcome::Sold(trade)) => {
                Some(self.trade_event(now, &candle, trade.profit, false))
            }
            _ => None,
        };

        let balance = match self.exchange.get_balance().await {
            Ok(balance) => Some(balance),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "Balance unavailable for status");
                None
            }
        };

        let status = StatusSnapshot {
            timestamp: now,
            pair: self.pair.clone(),
            algorithm: self.engine.algorithm(),
            cumulative_profit: self.lifecycle.cumulative_profit(),
            position: self.lifecycle.position().cloned(),
            last_close: candle.close,
            balance,
            loss_streak: self.breaker.loss_streak(),
            paused_until: self.breaker.paused_until(),
        };
        tracing::info!(
            "📈 {} close {:.2} | buy={} sell={} | profit {:+.2} | {}",
            self.pair,
            candle.close,
            signal.buy,
            signal.sell,
            status.cumulative_profit,
            if status.position.is_some() { "holding" } else { "idle" }
        );

        self.cycles += 1;
        Ok(Some(CycleReport {
            candle,
            signal,
            decision,
            outcome,
            breaker_trip,
            status,
            trade_event,
        }))
    }

    /// Wait out the breaker cooldown on the clock, logging progress at most
    /// once a minute; returns `false` on shutdown
    async fn cool_down(&mut self) -> bool {
        let candle_period = self.feed.tick_period() * self.feed.interval() as u32;
        let step = candle_period.max(Duration::from_secs(60));

        while let Some(until) = self.breaker.paused_until() {
            let now = self.clock.now();
            if now >= until {
                break;
            }

            let remaining = (until - now).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(
                "⏸️  Circuit breaker cooldown: {} minutes remaining",
                remaining.as_secs().div_ceil(60)
            );

            if self.shutdown.sleep(&self.clock, remaining.min(step)).await {
                return false;
            }
        }
        true
    }

    async fn next_candle(&mut self) -> Result<Option<Candle>, ExchangeError> {
        self.feed
            .next_candle(&mut self.exchange, &self.clock, &mut self.shutdown)
            .await
    }

    fn trade_event(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        candle: &Candle,
        profit_delta: f64,
        did_buy: bool,
    ) -> TradeEvent {
        TradeEvent {
            timestamp: now,
            algorithm: self.engine.algorithm(),
            profit_delta,
            close_price: candle.close,
            did_buy,
            did_sell: !did_buy,
        }
    }

    fn summary(&self, stop_reason: StopReason) -> RunSummary {
        RunSummary {
            cycles: self.cycles,
            cumulative_profit: self.lifecycle.cumulative_profit(),
            completed_trades: self.lifecycle.completed_trades(),
            breaker_trips: self.breaker.trips(),
            stop_reason,
        }
    }

    pub fn lifecycle(&self) -> &OrderLifecycle {
        &self.lifecycle
    }

    pub fn breaker(&self) -> &DrawdownBreaker {
        &self.breaker
    }

    pub fn series(&self) -> &RollingSeries<Candle> {
        &self.series
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;
use crate::exchange::Exchange;
use crate::models::{Position, RateAmount, Side};

/// How much currency a buy spends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TradeAmount {
    Fixed(f64),
    /// Whole available currency balance at the time of the buy
    FullBalance,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    PositionOpen(Position),
}

/// A completed buy→sell round trip
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub position: Position,
    pub sold_asset_amount: f64,
    pub proceeds: f64,
    pub profit: f64,
    pub closed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Bought(Position),
    Sold(ClosedTrade),
    /// Transition refused or failed; state is unchanged
    Failed { side: Side, reason: String },
}

/// Single-position order state machine: `Idle → PositionOpen → Idle`
///
/// Cumulative profit only changes on a completed sell.
#[derive(Debug, Clone)]
pub struct OrderLifecycle {
    state: LifecycleState,
    amount: TradeAmount,
    cumulative_profit: f64,
    completed_trades: usize,
}

impl OrderLifecycle {
    pub fn new(amount: TradeAmount) -> Self {
        Self::with_cumulative_profit(amount, 0.0)
    }

    /// Start from a previously journaled cumulative profit
    pub fn with_cumulative_profit(amount: TradeAmount, cumulative_profit: f64) -> Self {
        Self {
            state: LifecycleState::Idle,
            amount,
            cumulative_profit,
            completed_trades: 0,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn position(&self) -> Option<&Position> {
        match &self.state {
            LifecycleState::PositionOpen(position) => Some(position),
            LifecycleState::Idle => None,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position().is_some()
    }

    pub fn cumulative_profit(&self) -> f64 {
        self.cumulative_profit
    }

    pub fn completed_trades(&self) -> usize {
        self.completed_trades
    }

    pub fn amount(&self) -> TradeAmount {
        self.amount
    }

    /// `Idle → PositionOpen` via a market buy
    ///
    /// Only `Fatal` errors are returned; anything else leaves the state
    /// untouched and is reported as `Failed`.
    pub async fn buy<E: Exchange>(
        &mut self,
        exchange: &mut E,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ExchangeError> {
        if self.has_position() {
            return Ok(failed(Side::Buy, "position already open"));
        }

        let amount = match self.amount {
            TradeAmount::Fixed(amount) => amount,
            TradeAmount::FullBalance => match exchange.get_balance().await {
                Ok(balance) => balance.currency,
                Err(e) => return recover(Side::Buy, e),
            },
        };
        if amount <= 0.0 {
            return Ok(failed(Side::Buy, "no currency to spend"));
        }

        let fill = match exchange.place_market_buy(amount).await {
            Ok(fill) => fill,
            Err(e) => return recover(Side::Buy, e),
        };

        let position = Position {
            order_id: fill.order_id,
            entry_amount: amount,
            acquired_asset_amount: fill.filled_asset_amount,
            opened_at: now,
        };

        tracing::info!(
            "🟢 BUY order {}: spent {:.2}, acquired {:.8}",
            position.order_id,
            position.entry_amount,
            position.acquired_asset_amount
        );

        self.state = LifecycleState::PositionOpen(position.clone());
        Ok(TransitionOutcome::Bought(position))
    }

    /// `PositionOpen → Idle` via a market sell of the held asset
    ///
    /// Proceeds come from a sell-rate quote for the sold amount; if that
    /// quote fails for any reason, `close_price` values the sale instead.
    pub async fn sell<E: Exchange>(
        &mut self,
        exchange: &mut E,
        now: DateTime<Utc>,
        close_price: f64,
    ) -> Result<TransitionOutcome, ExchangeError> {
        let Some(position) = self.position().cloned() else {
            return Ok(failed(Side::Sell, "no open position"));
        };

        let fill = match exchange
            .place_market_sell(position.acquired_asset_amount)
            .await
        {
            Ok(fill) => fill,
            Err(e) => return recover(Side::Sell, e),
        };
        let sold = fill.sold_asset_amount;

        let proceeds = match exchange.get_rate(Side::Sell, RateAmount::Asset(sold)).await {
            Ok(quote) => quote.price,
            // The asset is already gone; finish the transition and let the
            // next exchange call surface a fatal error
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "⚠️  Sell rate unavailable, valuing sale at last close {:.2}",
                    close_price
                );
                sold * close_price
            }
        };

        let profit = proceeds - position.entry_amount;
        self.cumulative_profit += profit;
        self.completed_trades += 1;
        self.state = LifecycleState::Idle;

        let emoji = if profit >= 0.0 { "💰" } else { "📉" };
        tracing::info!(
            "{} SELL order {}: proceeds {:.2}, profit {:+.2} (cumulative {:+.2})",
            emoji,
            fill.order_id,
            proceeds,
            profit,
            self.cumulative_profit
        );

        Ok(TransitionOutcome::Sold(ClosedTrade {
            position,
            sold_asset_amount: sold,
            proceeds,
            profit,
            closed_at: now,
        }))
    }
}

fn failed(side: Side, reason: impl Into<String>) -> TransitionOutcome {
    TransitionOutcome::Failed {
        side,
        reason: reason.into(),
    }
}

fn recover(side: Side, error: ExchangeError) -> Result<TransitionOutcome, ExchangeError> {
    if error.is_fatal() {
        return Err(error);
    }

    tracing::warn!(side = side.as_str(), error = %error, "⚠️  Order not placed");
    Ok(failed(side, error.to_string()))
}

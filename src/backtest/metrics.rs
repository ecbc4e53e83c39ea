use crate::execution::ClosedTrade;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of a single round trip for analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub entry_amount: f64,
    pub proceeds: f64,
    pub asset_amount: f64,
    pub profit: f64,
    pub return_pct: f64,
    pub holding_period_minutes: i64,
}

impl TradeRecord {
    pub fn from_closed(trade: &ClosedTrade) -> Self {
        let entry = trade.position.entry_amount;
        let return_pct = if entry > 0.0 {
            trade.profit / entry * 100.0
        } else {
            0.0
        };

        Self {
            opened_at: trade.position.opened_at,
            closed_at: trade.closed_at,
            entry_amount: entry,
            proceeds: trade.proceeds,
            asset_amount: trade.sold_asset_amount,
            profit: trade.profit,
            return_pct,
            holding_period_minutes: (trade.closed_at - trade.position.opened_at).num_minutes(),
        }
    }
}

/// Complete backtest performance metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    // Profit
    pub total_profit: f64,
    pub total_return_pct: f64,
    pub initial_equity: f64,
    pub final_equity: f64,

    // Trade statistics
    pub cycles: usize,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub failed_orders: usize,

    // Profit distribution
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,

    // Risk
    pub max_drawdown: f64,
    pub circuit_breaker_hits: usize,

    pub avg_holding_period_minutes: f64,

    pub trades: Vec<TradeRecord>,
}

/// Run-level counters gathered alongside the trade records
#[derive(Debug, Clone, Copy, Default)]
pub struct RunCounters {
    pub cycles: usize,
    pub failed_orders: usize,
    pub circuit_breaker_hits: usize,
}

impl BacktestMetrics {
    /// Calculate metrics from completed round trips
    ///
    /// Equity is currency plus held asset valued at the last close.
    pub fn from_trades(
        trades: Vec<TradeRecord>,
        initial_equity: f64,
        final_equity: f64,
        counters: RunCounters,
    ) -> Self {
        let total_trades = trades.len();
        let total_profit: f64 = trades.iter().map(|t| t.profit).sum();
        let total_return_pct = if initial_equity > 0.0 {
            (final_equity - initial_equity) / initial_equity * 100.0
        } else {
            0.0
        };

        let wins: Vec<f64> = trades.iter().map(|t| t.profit).filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| t.profit).filter(|p| *p <= 0.0).collect();

        let win_rate = if total_trades > 0 {
            wins.len() as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let total_wins: f64 = wins.iter().sum();
        let total_losses: f64 = losses.iter().map(|l| l.abs()).sum();
        let avg_win = mean(&wins);
        let avg_loss = if losses.is_empty() {
            0.0
        } else {
            total_losses / losses.len() as f64
        };

        let largest_win = wins.iter().copied().fold(0.0, f64::max);
        let largest_loss = losses.iter().copied().fold(0.0, f64::min);

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let holding: Vec<f64> = trades
            .iter()
            .map(|t| t.holding_period_minutes as f64)
            .collect();

        Self {
            total_profit,
            total_return_pct,
            initial_equity,
            final_equity,
            cycles: counters.cycles,
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate,
            failed_orders: counters.failed_orders,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            profit_factor,
            max_drawdown: Self::calculate_drawdown(&trades),
            circuit_breaker_hits: counters.circuit_breaker_hits,
            avg_holding_period_minutes: mean(&holding),
            trades,
        }
    }

    /// Largest peak-to-trough fall of cumulative profit
    fn calculate_drawdown(trades: &[TradeRecord]) -> f64 {
        let mut peak = 0.0_f64;
        let mut cumulative = 0.0;
        let mut max_dd = 0.0_f64;

        for trade in trades {
            cumulative += trade.profit;
            peak = peak.max(cumulative);
            max_dd = max_dd.max(peak - cumulative);
        }

        max_dd
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!("\n=============== BACKTEST PERFORMANCE REPORT ===============\n");

        println!("📊 PROFIT SUMMARY");
        println!("  Initial Equity:        ¥{:.0}", self.initial_equity);
        println!("  Final Equity:          ¥{:.0}", self.final_equity);
        println!(
            "  Realized Profit:       ¥{:.0} ({:+.2}%)",
            self.total_profit, self.total_return_pct
        );

        println!("\n📈 TRADE STATISTICS");
        println!("  Cycles:                {}", self.cycles);
        println!("  Round Trips:           {}", self.total_trades);
        println!(
            "  Winning Trades:        {} ({:.1}%)",
            self.winning_trades, self.win_rate
        );
        println!("  Losing Trades:         {}", self.losing_trades);
        println!("  Failed Orders:         {}", self.failed_orders);

        if self.total_trades > 0 {
            println!("\n💰 WIN/LOSS ANALYSIS");
            println!("  Average Win:           ¥{:.0}", self.avg_win);
            println!("  Average Loss:          ¥{:.0}", self.avg_loss);
            println!("  Largest Win:           ¥{:.0}", self.largest_win);
            println!("  Largest Loss:          ¥{:.0}", self.largest_loss);
            println!("  Profit Factor:         {:.2}", self.profit_factor);
            println!(
                "  Avg Holding Period:    {:.0} min",
                self.avg_holding_period_minutes
            );
        }

        println!("\n⚠️  RISK");
        println!("  Max Drawdown:          ¥{:.0}", self.max_drawdown);
        println!("  Circuit Breaker Hits:  {}", self.circuit_breaker_hits);
        println!();
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

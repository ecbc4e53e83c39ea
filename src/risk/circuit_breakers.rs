use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::execution::RollingSeries;

/// Drawdown circuit breaker limits
#[derive(Debug, Clone)]
pub struct CircuitBreakers {
    /// Realized loss, as a fraction of entry cost, that trips the breaker
    pub max_loss_ratio: f64,
    /// Consecutive losing trades that trip the breaker
    pub max_losing_streak: usize,
    /// How long trading stays suspended after a trip
    pub cooldown: Duration,
}

impl Default for CircuitBreakers {
    fn default() -> Self {
        Self {
            max_loss_ratio: 0.01, // -1% of the position
            max_losing_streak: 3, // 3 losses in a row
            cooldown: Duration::hours(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CircuitBreakerTrip {
    /// A single trade lost more than the allowed fraction of its entry cost
    LossMagnitude { profit: f64, entry_cost: f64 },
    /// Cumulative profit fell on each of the last trades
    LosingStreak { trades: usize },
}

impl CircuitBreakers {
    /// `profit + ratio * entry_cost < 0`
    pub fn loss_exceeded(&self, profit: f64, entry_cost: f64) -> bool {
        profit + self.max_loss_ratio * entry_cost < 0.0
    }

    /// True when the history is full and every entry is strictly below its predecessor
    pub fn streak_exceeded(&self, history: &RollingSeries<f64>) -> bool {
        if history.len() < self.max_losing_streak + 1 {
            return false;
        }

        let recent = history.recent(self.max_losing_streak + 1);
        recent.windows(2).all(|w| w[1] < w[0])
    }

    pub fn check(
        &self,
        profit: f64,
        entry_cost: f64,
        history: &RollingSeries<f64>,
    ) -> Result<(), CircuitBreakerTrip> {
        if self.loss_exceeded(profit, entry_cost) {
            return Err(CircuitBreakerTrip::LossMagnitude { profit, entry_cost });
        }

        if self.streak_exceeded(history) {
            return Err(CircuitBreakerTrip::LosingStreak {
                trades: self.max_losing_streak,
            });
        }

        Ok(())
    }

    fn history_capacity(&self) -> usize {
        self.max_losing_streak + 1
    }
}

/// Breaker state observed across trades
///
/// Owns the profit history: the running cumulative profit after each
/// completed trade, so consecutive differences are the per-trade profits.
#[derive(Debug, Clone)]
pub struct DrawdownBreaker {
    limits: CircuitBreakers,
    history: RollingSeries<f64>,
    loss_streak: u32,
    paused_until: Option<DateTime<Utc>>,
    trips: usize,
}

impl DrawdownBreaker {
    pub fn new(limits: CircuitBreakers) -> Self {
        Self::with_baseline(limits, 0.0)
    }

    /// Start observing from an existing cumulative profit
    pub fn with_baseline(limits: CircuitBreakers, cumulative_profit: f64) -> Self {
        let capacity = limits.history_capacity();
        let history = Self::baseline(capacity, cumulative_profit);
        Self {
            limits,
            history,
            loss_streak: 0,
            paused_until: None,
            trips: 0,
        }
    }

    fn baseline(capacity: usize, cumulative_profit: f64) -> RollingSeries<f64> {
        RollingSeries::seeded(
            capacity,
            std::iter::repeat(cumulative_profit).take(capacity - 1),
        )
    }

    /// Observe a completed round trip
    ///
    /// On a trip, trading is suspended until `now + cooldown`.
    pub fn record_trade(
        &mut self,
        now: DateTime<Utc>,
        profit: f64,
        entry_cost: f64,
        cumulative_profit: f64,
    ) -> Option<CircuitBreakerTrip> {
        self.history.push(cumulative_profit);

        if profit < 0.0 {
            self.loss_streak += 1;
        } else {
            self.loss_streak = 0;
        }

        match self.limits.check(profit, entry_cost, &self.history) {
            Ok(()) => None,
            Err(trip) => {
                let until = now + self.limits.cooldown;
                self.paused_until = Some(until);
                self.trips += 1;
                tracing::warn!(
                    ?trip,
                    profit,
                    entry_cost,
                    paused_until = %until,
                    "Circuit breaker tripped"
                );
                Some(trip)
            }
        }
    }

    /// True while a trip is waiting to be cleared by `resume`
    pub fn is_tripped(&self) -> bool {
        self.paused_until.is_some()
    }

    pub fn is_paused(&self, now: DateTime<Utc>) -> bool {
        self.paused_until.is_some_and(|until| now < until)
    }

    /// Clear the trip and restart observation from the current cumulative profit
    pub fn resume(&mut self, cumulative_profit: f64) {
        self.history = Self::baseline(self.limits.history_capacity(), cumulative_profit);
        self.loss_streak = 0;
        self.paused_until = None;
        tracing::info!(cumulative_profit, "Circuit breaker reset, resuming trading");
    }

    pub fn paused_until(&self) -> Option<DateTime<Utc>> {
        self.paused_until
    }

    pub fn loss_streak(&self) -> u32 {
        self.loss_streak
    }

    pub fn trips(&self) -> usize {
        self.trips
    }

    pub fn history(&self) -> &RollingSeries<f64> {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> DrawdownBreaker {
        DrawdownBreaker::new(CircuitBreakers::default())
    }

    /// Feed per-trade profits, returning the trip (if any) after each trade
    fn feed(
        breaker: &mut DrawdownBreaker,
        profits: &[f64],
        entry_cost: f64,
    ) -> Vec<Option<CircuitBreakerTrip>> {
        let mut cumulative = 0.0;
        profits
            .iter()
            .map(|&p| {
                cumulative += p;
                breaker.record_trade(Utc::now(), p, entry_cost, cumulative)
            })
            .collect()
    }

    #[test]
    fn test_loss_magnitude_trips() {
        let limits = CircuitBreakers::default();
        assert!(limits.loss_exceeded(-150.0, 10000.0)); // -150 + 100 < 0
        assert!(!limits.loss_exceeded(-50.0, 10000.0)); // -50 + 100 = 50
        assert!(!limits.loss_exceeded(-100.0, 10000.0)); // boundary never trips
    }

    #[test]
    fn test_loss_magnitude_pauses_for_cooldown() {
        let mut breaker = breaker();
        let now = Utc::now();

        let trip = breaker.record_trade(now, -150.0, 10000.0, -150.0);
        assert_eq!(
            trip,
            Some(CircuitBreakerTrip::LossMagnitude {
                profit: -150.0,
                entry_cost: 10000.0
            })
        );
        assert!(breaker.is_paused(now + Duration::hours(4)));
        assert!(!breaker.is_paused(now + Duration::hours(5)));
        assert_eq!(breaker.paused_until(), Some(now + Duration::hours(5)));
    }

    #[test]
    fn test_small_loss_does_not_trip() {
        let mut breaker = breaker();
        assert_eq!(breaker.record_trade(Utc::now(), -50.0, 10000.0, -50.0), None);
        assert!(!breaker.is_tripped());
        assert_eq!(breaker.loss_streak(), 1);
    }

    #[test]
    fn test_streak_trips_on_third_consecutive_loss() {
        let mut breaker = breaker();
        // Entry cost large enough that the magnitude rule stays quiet
        let trips = feed(&mut breaker, &[10.0, -5.0, -3.0, -2.0], 100_000.0);

        assert!(trips[..3].iter().all(Option::is_none));
        assert_eq!(trips[3], Some(CircuitBreakerTrip::LosingStreak { trades: 3 }));
        assert_eq!(breaker.history().to_vec(), vec![10.0, 5.0, 2.0, 0.0]);
        assert_eq!(breaker.loss_streak(), 3);
    }

    #[test]
    fn test_win_breaks_streak() {
        let mut breaker = breaker();
        let trips = feed(&mut breaker, &[-1.0, -1.0, 4.0, -1.0, -1.0], 100_000.0);
        assert!(trips.iter().all(Option::is_none));
        assert_eq!(breaker.loss_streak(), 2);
    }

    #[test]
    fn test_baseline_needs_three_fresh_losses() {
        let mut breaker = breaker();
        let trips = feed(&mut breaker, &[-1.0, -1.0], 100_000.0);
        assert!(trips.iter().all(Option::is_none));

        // Baseline [0, 0, 0] plus two losses: [0, 0, -1, -2]
        assert_eq!(breaker.history().to_vec(), vec![0.0, 0.0, -1.0, -2.0]);
    }

    #[test]
    fn test_resume_reseeds_history() {
        let mut breaker = breaker();
        feed(&mut breaker, &[-1.0, -1.0, -1.0], 100_000.0);
        assert!(breaker.is_tripped());
        assert_eq!(breaker.trips(), 1);

        breaker.resume(-3.0);
        assert!(!breaker.is_tripped());
        assert_eq!(breaker.loss_streak(), 0);
        assert_eq!(breaker.history().to_vec(), vec![-3.0, -3.0, -3.0]);

        // One more loss after reset is not a streak
        assert_eq!(breaker.record_trade(Utc::now(), -1.0, 100_000.0, -4.0), None);
    }

    #[test]
    fn test_restored_baseline_counts_fresh_losses() {
        let mut breaker = DrawdownBreaker::with_baseline(CircuitBreakers::default(), 500.0);
        assert_eq!(breaker.history().to_vec(), vec![500.0, 500.0, 500.0]);

        let trips: Vec<_> = [490.0, 480.0, 470.0]
            .iter()
            .map(|&c| breaker.record_trade(Utc::now(), -10.0, 100_000.0, c))
            .collect();
        assert_eq!(trips[2], Some(CircuitBreakerTrip::LosingStreak { trades: 3 }));
    }

    #[test]
    fn test_zero_cooldown_is_not_paused_but_tripped() {
        let mut breaker = DrawdownBreaker::new(CircuitBreakers {
            cooldown: Duration::zero(),
            ..Default::default()
        });
        let now = Utc::now();
        assert!(breaker.record_trade(now, -500.0, 10000.0, -500.0).is_some());
        assert!(breaker.is_tripped());
        assert!(!breaker.is_paused(now));
    }
}

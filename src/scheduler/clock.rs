use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Time source for the trading loop
///
/// Live trading sleeps on the tokio timer; simulation and tests advance a
/// virtual clock instantly.
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock; clones share the same instant
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl SimulatedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::weeks(52));
        self.now.set(self.now.get() + step);
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_sleep_advances_instantly() {
        let start = Utc::now();
        let clock = SimulatedClock::new(start);
        let shared = clock.clone();

        clock.sleep(Duration::from_secs(5 * 3600)).await;

        assert_eq!(shared.now() - start, chrono::Duration::hours(5));
    }

    #[tokio::test]
    async fn test_system_clock_zero_sleep() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::ZERO).await;
        assert!(clock.now() >= before);
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::Clock;

/// Sender side; `trigger` asks the trading loop to stop at its next tick boundary
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        // Receivers may already be gone during teardown
        let _ = self.tx.send(true);
    }
}

/// Receiver side observed by the price feed and scheduler
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

pub fn channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (
        ShutdownHandle { tx },
        ShutdownSignal {
            rx,
            _keepalive: None,
        },
    )
}

impl ShutdownSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested or the handle is dropped
    pub async fn triggered(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleep on `clock`, cut short by shutdown; returns true if shutdown won
    pub async fn sleep<C: Clock>(&mut self, clock: &C, duration: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }

        tokio::select! {
            _ = clock.sleep(duration) => self.is_triggered(),
            _ = self.triggered() => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SimulatedClock;

    #[tokio::test]
    async fn test_trigger_is_observed() {
        let (handle, mut signal) = channel();
        assert!(!signal.is_triggered());

        handle.trigger();
        assert!(signal.is_triggered());
        signal.triggered().await;
    }

    #[tokio::test]
    async fn test_sleep_returns_false_without_shutdown() {
        let (_handle, mut signal) = channel();
        let clock = SimulatedClock::default();
        assert!(!signal.sleep(&clock, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_sleep_short_circuits_after_trigger() {
        let (handle, mut signal) = channel();
        handle.trigger();
        let clock = SimulatedClock::default();
        let start = clock.now();

        assert!(signal.sleep(&clock, Duration::from_secs(60)).await);
        assert_eq!(clock.now(), start);
    }

    #[tokio::test]
    async fn test_dropped_handle_counts_as_shutdown() {
        let (handle, mut signal) = channel();
        drop(handle);
        signal.triggered().await;
    }

    #[test]
    fn test_never_stays_quiet() {
        let signal = ShutdownSignal::never();
        assert!(!signal.is_triggered());
    }
}

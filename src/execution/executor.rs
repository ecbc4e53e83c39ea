use super::LifecycleState;
use crate::models::SignalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionAction {
    Buy,
    Sell,
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

impl ExecutionDecision {
    fn new(action: ExecutionAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
        }
    }

    fn skip(reason: impl Into<String>) -> Self {
        Self::new(ExecutionAction::Skip, reason)
    }
}

/// Decide what one cycle should do with a signal
///
/// Pure: buys only from `Idle`, sells only from `PositionOpen`, nothing while
/// the breaker is cooling down. When both flags are set the current state
/// picks the meaningful one.
pub fn process_signal(
    signal: SignalResult,
    state: &LifecycleState,
    paused: bool,
) -> ExecutionDecision {
    if signal.is_none() {
        return ExecutionDecision::skip("No signal");
    }

    if paused {
        return ExecutionDecision::skip("Circuit breaker cooling down");
    }

    match state {
        LifecycleState::Idle if signal.buy => {
            ExecutionDecision::new(ExecutionAction::Buy, "Buy signal while idle")
        }
        LifecycleState::Idle => ExecutionDecision::skip("Sell signal ignored - no open position"),
        LifecycleState::PositionOpen(position) if signal.sell => ExecutionDecision::new(
            ExecutionAction::Sell,
            format!("Sell signal closes order {}", position.order_id),
        ),
        LifecycleState::PositionOpen(_) => {
            ExecutionDecision::skip("Buy signal ignored - position already open")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;
    use chrono::Utc;

    fn open() -> LifecycleState {
        LifecycleState::PositionOpen(Position {
            order_id: "7".to_string(),
            entry_amount: 10000.0,
            acquired_asset_amount: 1.0,
            opened_at: Utc::now(),
        })
    }

    #[test]
    fn test_buy_from_idle() {
        let decision = process_signal(SignalResult::new(true, false), &LifecycleState::Idle, false);
        assert_eq!(decision.action, ExecutionAction::Buy);
    }

    #[test]
    fn test_skip_buy_when_already_positioned() {
        let decision = process_signal(SignalResult::new(true, false), &open(), false);
        assert_eq!(decision.action, ExecutionAction::Skip);
        assert!(decision.reason.contains("already open"));
    }

    #[test]
    fn test_skip_sell_when_no_position() {
        let decision = process_signal(SignalResult::new(false, true), &LifecycleState::Idle, false);
        assert_eq!(decision.action, ExecutionAction::Skip);
        assert!(decision.reason.contains("no open position"));
    }

    #[test]
    fn test_sell_closes_open_position() {
        let decision = process_signal(SignalResult::new(false, true), &open(), false);
        assert_eq!(decision.action, ExecutionAction::Sell);
        assert!(decision.reason.contains('7'));
    }

    #[test]
    fn test_both_flags_resolved_by_state() {
        let both = SignalResult::new(true, true);
        assert_eq!(
            process_signal(both, &LifecycleState::Idle, false).action,
            ExecutionAction::Buy
        );
        assert_eq!(process_signal(both, &open(), false).action, ExecutionAction::Sell);
    }

    #[test]
    fn test_paused_skips_everything() {
        let decision = process_signal(SignalResult::new(true, false), &LifecycleState::Idle, true);
        assert_eq!(decision.action, ExecutionAction::Skip);
        assert!(decision.reason.contains("Circuit breaker"));

        let decision = process_signal(SignalResult::new(false, true), &open(), true);
        assert_eq!(decision.action, ExecutionAction::Skip);
    }

    #[test]
    fn test_no_signal() {
        let decision = process_signal(SignalResult::NONE, &open(), false);
        assert_eq!(decision, ExecutionDecision::skip("No signal"));
    }
}

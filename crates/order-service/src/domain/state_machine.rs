//! Order status ranks and the idempotence rule, ported from the original
//! `getOrderWithStatus` rank comparison in `order-service/core/application.go`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Prepared,
    Confirmed,
    Completed,
    Rejected,
    RolledBack,
}

impl OrderStatus {
    /// Monotonic rank used for the idempotence comparison. Terminal states
    /// all share the top rank since none of them can be reached "through"
    /// another.
    pub fn rank(self) -> u8 {
        match self {
            OrderStatus::New => 0,
            OrderStatus::Prepared => 1,
            OrderStatus::Confirmed => 2,
            OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::RolledBack => 100,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::RolledBack)
    }
}

/// Result of checking whether a transition to `target` should actually run
/// against an order currently at some rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The order is already past (or at) `target`'s rank: a terminal state,
    /// or the very state we're trying to reach. Drop the event.
    AlreadyProcessed,
    /// `target` is directly reachable from the current rank (rank - 1), or
    /// `target` is terminal and reachable from anywhere non-terminal.
    Apply,
    /// Neither of the above: the event arrived for an order that skipped a
    /// state it should have passed through first.
    Invalid,
}

/// The idempotence rule from spec §4.1: given the order's current status
/// and the status an incoming event wants to move it to, decide whether to
/// apply, silently drop, or reject the transition.
pub fn transition_check(current: OrderStatus, target: OrderStatus) -> TransitionOutcome {
    if current == target || current.is_terminal() {
        return TransitionOutcome::AlreadyProcessed;
    }

    let (current_rank, target_rank) = (current.rank(), target.rank());

    if current_rank == target_rank - 1 || target.is_terminal() {
        return TransitionOutcome::Apply;
    }

    TransitionOutcome::Invalid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_rank_transition_applies() {
        assert_eq!(transition_check(OrderStatus::New, OrderStatus::Prepared), TransitionOutcome::Apply);
        assert_eq!(transition_check(OrderStatus::Prepared, OrderStatus::Confirmed), TransitionOutcome::Apply);
    }

    #[test]
    fn same_state_is_already_processed() {
        assert_eq!(
            transition_check(OrderStatus::Prepared, OrderStatus::Prepared),
            TransitionOutcome::AlreadyProcessed
        );
    }

    #[test]
    fn terminal_target_applies_from_any_non_terminal_state() {
        assert_eq!(transition_check(OrderStatus::New, OrderStatus::RolledBack), TransitionOutcome::Apply);
        assert_eq!(transition_check(OrderStatus::Confirmed, OrderStatus::RolledBack), TransitionOutcome::Apply);
    }

    #[test]
    fn terminal_current_state_absorbs_any_further_event() {
        assert_eq!(transition_check(OrderStatus::Completed, OrderStatus::Confirmed), TransitionOutcome::AlreadyProcessed);
        assert_eq!(transition_check(OrderStatus::RolledBack, OrderStatus::Completed), TransitionOutcome::AlreadyProcessed);
    }

    #[test]
    fn skipping_a_non_terminal_state_is_invalid() {
        assert_eq!(transition_check(OrderStatus::New, OrderStatus::Confirmed), TransitionOutcome::Invalid);
    }

    #[test]
    fn a_lower_non_terminal_target_is_invalid_not_already_processed() {
        assert_eq!(transition_check(OrderStatus::Confirmed, OrderStatus::Prepared), TransitionOutcome::Invalid);
    }
}

//! Lifecycle of one filter invocation

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Code carried by an [`crate::report::Error`] built from a [`StateError`]
pub const ILLEGAL_TRANSITION: i32 = -300;

/// Where a filter invocation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterState {
    Unbound,
    Bound,
    Preflighted,
    /// Preflight actions applied to the tree
    Applied,
    Executed,
    Done,
    Failed,
    Cancelled,
}

impl FilterState {
    pub const ALL: [Self; 8] = [
        Self::Unbound,
        Self::Bound,
        Self::Preflighted,
        Self::Applied,
        Self::Executed,
        Self::Done,
        Self::Failed,
        Self::Cancelled,
    ];

    /// No transition leaves a terminal state
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

impl Display for FilterState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unbound => "unbound",
            Self::Bound => "bound",
            Self::Preflighted => "preflighted",
            Self::Applied => "applied",
            Self::Executed => "executed",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("illegal filter state transition {from} -> {to}")]
    IllegalTransition { from: FilterState, to: FilterState },
}

impl From<StateError> for crate::report::Error {
    fn from(err: StateError) -> Self {
        Self::state(ILLEGAL_TRANSITION, err.to_string())
    }
}

/// Validates a state transition.
///
/// With the `strict-debug` feature an illegal transition panics instead.
///
/// # Errors
/// [`StateError::IllegalTransition`] when `to` is not reachable from `from`.
pub fn validate_transition(from: FilterState, to: FilterState) -> Result<(), StateError> {
    if allowed(from, to) {
        return Ok(());
    }
    if cfg!(feature = "strict-debug") {
        panic!("illegal filter state transition attempted: {from:?} -> {to:?}");
    }
    Err(StateError::IllegalTransition { from, to })
}

#[must_use]
pub fn allowed_transitions(from: FilterState) -> Vec<FilterState> {
    use FilterState::{Applied, Bound, Cancelled, Done, Executed, Failed, Preflighted, Unbound};
    match from {
        Unbound => vec![Bound, Failed],
        Bound => vec![Bound, Preflighted, Failed],
        Preflighted => vec![Bound, Preflighted, Applied, Failed],
        Applied => vec![Executed, Failed, Cancelled],
        Executed => vec![Done, Failed, Cancelled],
        Done | Failed | Cancelled => vec![],
    }
}

fn allowed(from: FilterState, to: FilterState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_allowed() {
        let path = [
            FilterState::Unbound,
            FilterState::Bound,
            FilterState::Preflighted,
            FilterState::Applied,
            FilterState::Executed,
            FilterState::Done,
        ];
        for pair in path.windows(2) {
            assert!(validate_transition(pair[0], pair[1]).is_ok(), "{pair:?}");
        }
    }

    #[test]
    fn rebind_and_repreflight() {
        assert!(validate_transition(FilterState::Preflighted, FilterState::Bound).is_ok());
        assert!(validate_transition(FilterState::Preflighted, FilterState::Preflighted).is_ok());
        assert!(validate_transition(FilterState::Applied, FilterState::Bound).is_err());
    }

    #[cfg(not(feature = "strict-debug"))]
    #[test]
    fn execute_before_apply_is_rejected() {
        let err = validate_transition(FilterState::Preflighted, FilterState::Executed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "illegal filter state transition preflighted -> executed"
        );
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for state in FilterState::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(allowed_transitions(state).is_empty());
        }
    }
}

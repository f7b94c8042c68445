#![cfg(not(feature = "strict-debug"))]

use proptest::prelude::*;
use strata_core::state_machine::{allowed_transitions, validate_transition};
use strata_core::FilterState;

fn any_state() -> impl Strategy<Value = FilterState> {
    prop_oneof![
        Just(FilterState::Unbound),
        Just(FilterState::Bound),
        Just(FilterState::Preflighted),
        Just(FilterState::Applied),
        Just(FilterState::Executed),
        Just(FilterState::Done),
        Just(FilterState::Failed),
        Just(FilterState::Cancelled),
    ]
}

#[test]
fn test_unbound_transitions() {
    assert!(validate_transition(FilterState::Unbound, FilterState::Bound).is_ok());
    assert!(validate_transition(FilterState::Unbound, FilterState::Failed).is_ok());

    // Invalid
    assert!(validate_transition(FilterState::Unbound, FilterState::Preflighted).is_err());
    assert!(validate_transition(FilterState::Unbound, FilterState::Cancelled).is_err());
}

#[test]
fn test_cancel_only_while_running() {
    assert!(validate_transition(FilterState::Applied, FilterState::Cancelled).is_ok());
    assert!(validate_transition(FilterState::Executed, FilterState::Cancelled).is_ok());
    assert!(validate_transition(FilterState::Bound, FilterState::Cancelled).is_err());
}

proptest! {
    #[test]
    fn prop_all_transitions_are_subset_of_allowed(from in any_state(), to in any_state()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }

    #[test]
    fn prop_every_active_state_can_fail(from in any_state()) {
        prop_assert_eq!(
            validate_transition(from, FilterState::Failed).is_ok(),
            !from.is_terminal()
        );
    }
}

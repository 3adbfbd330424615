use crate::connection::{PairingState, PairingStatus};

/// **VALUE**: Verifies the legal status moves within one attempt.
///
/// **WHY THIS MATTERS**: The UI offers retry only in retry-error and shows the code only
/// while connecting; impossible moves would confuse both.
///
/// **BUG THIS CATCHES**: Would catch idle jumping straight to paired.
#[test]
fn given_status_table_when_checked_then_only_legal_moves_are_allowed() {
    use PairingStatus::*;

    assert!(Idle.allows(Connecting));
    assert!(Connecting.allows(Paired));
    assert!(Connecting.allows(RetryError));
    assert!(Paired.allows(Paired));
    assert!(Paired.allows(RetryError));
    assert!(RetryError.allows(Connecting));
    assert!(Paired.allows(Idle));

    assert!(!Idle.allows(Paired));
    assert!(!Idle.allows(RetryError));
    assert!(!RetryError.allows(Paired));
}

/// **VALUE**: Verifies an illegal transition leaves the state untouched.
///
/// **WHY THIS MATTERS**: A late message on a reset client must not resurrect a pairing.
///
/// **BUG THIS CATCHES**: Would catch `transition` applying the status before checking.
#[test]
fn given_idle_state_when_mark_paired_then_state_is_unchanged() {
    let mut state = PairingState::default();

    state.mark_paired(Some("Phone".to_string()));

    assert_eq!(state, PairingState::default());
}

/// **VALUE**: Verifies pairing keeps a known partner name when later messages carry none.
///
/// **WHY THIS MATTERS**: Only `partner-connected` names the partner; pongs must not erase it.
///
/// **BUG THIS CATCHES**: Would catch `mark_paired(None)` clearing the name.
#[test]
fn given_named_partner_when_mark_paired_without_name_then_name_is_kept() {
    let mut state = PairingState::default();
    state.transition(PairingStatus::Connecting);
    state.mark_paired(Some("Phone".to_string()));

    state.mark_paired(None);

    assert_eq!(state.status, PairingStatus::Paired);
    assert_eq!(state.partner_device_name.as_deref(), Some("Phone"));
}

/// **VALUE**: Verifies status values serialize the way UI bindings expect.
///
/// **WHY THIS MATTERS**: Front ends match on these strings.
///
/// **BUG THIS CATCHES**: Would catch a missing kebab-case rename.
#[test]
fn given_status_when_serialized_then_is_kebab_case() {
    assert_eq!(
        serde_json::to_value(PairingStatus::RetryError).expect("serializes"),
        serde_json::json!("retry-error")
    );
}

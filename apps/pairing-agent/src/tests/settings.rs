use crate::settings::{
    AgentRole, AgentSettings, ENV_CODE, ENV_PAIRING_ID, ENV_ROLE, ENV_SESSION_KIND,
    ENV_SESSION_TOKEN, ENV_STATIC_SIGNATURE,
};

use pairing_core::session::SessionKind;

use std::collections::HashMap;

fn settings_from(pairs: &[(&str, &str)]) -> Result<AgentSettings, crate::error::AgentError> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    AgentSettings::from_lookup(|variable| vars.get(variable).cloned())
}

/// **VALUE**: Verifies the target role picks up code, id and a local session.
///
/// **WHY THIS MATTERS**: A target without its credential cannot authenticate to the relay.
///
/// **BUG THIS CATCHES**: Would catch the seeded session defaulting to a distant credential.
#[test]
fn given_target_env_when_parsed_then_role_and_local_session_are_set() {
    let settings = settings_from(&[
        (ENV_ROLE, "target"),
        (ENV_CODE, "424242"),
        (ENV_PAIRING_ID, "p-1"),
        (ENV_SESSION_TOKEN, "token"),
        (ENV_STATIC_SIGNATURE, "0xabcd"),
    ])
    .expect("valid settings");

    assert_eq!(
        settings.role,
        AgentRole::Target {
            code: "424242".to_string(),
            pairing_id: Some("p-1".to_string()),
        }
    );
    let session = settings.session.expect("seeded session");
    assert_eq!(session.kind, SessionKind::Webauthn);
    assert_eq!(session.token.expose(), "token");
    assert_eq!(settings.static_signature.as_bytes(), &[0xab, 0xcd]);
}

/// **VALUE**: Verifies missing or unknown settings are reported.
///
/// **WHY THIS MATTERS**: Starting with a half-configured role would just sit idle.
///
/// **BUG THIS CATCHES**: Would catch a target starting without a code.
#[test]
fn given_incomplete_env_when_parsed_then_returns_settings_error() {
    let cases: [&[(&str, &str)]; 4] = [
        &[],
        &[(ENV_ROLE, "bystander")],
        &[(ENV_ROLE, "target")],
        &[(ENV_ROLE, "origin"), (ENV_SESSION_TOKEN, "t"), (ENV_SESSION_KIND, "ecdsa")],
    ];

    for pairs in cases {
        let err = settings_from(pairs).expect_err("should be rejected");
        assert!(format!("{err:?}").contains("Settings"), "{pairs:?}");
    }
}

/// **VALUE**: Verifies the origin role defaults and the resume role.
///
/// **WHY THIS MATTERS**: An origin started fresh has no session at all.
///
/// **BUG THIS CATCHES**: Would catch an absent token creating an empty session.
#[test]
fn given_origin_and_resume_env_when_parsed_then_sessions_follow_role() {
    let origin = settings_from(&[(ENV_ROLE, "origin")]).expect("origin");
    let resume = settings_from(&[(ENV_ROLE, "resume"), (ENV_SESSION_TOKEN, "t")]).expect("resume");

    assert_eq!(origin.role, AgentRole::Origin { session_hint: None });
    assert!(origin.session.is_none());
    assert_eq!(origin.static_signature.as_bytes(), &[0x00]);

    assert_eq!(resume.role, AgentRole::Resume);
    assert_eq!(
        resume.session.map(|session| session.kind),
        Some(SessionKind::DistantWebauthn)
    );
}

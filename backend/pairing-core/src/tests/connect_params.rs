use crate::connection::{ConnectAction, ConnectParams};

use common::RedactedToken;

use url::Url;

fn relay() -> Url {
    Url::parse("ws://127.0.0.1:3030/pairing/ws").expect("valid url")
}

fn query(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// **VALUE**: Verifies an initiate request carries the action and the session hint.
///
/// **WHY THIS MATTERS**: The relay decides what kind of channel to open from the query.
///
/// **BUG THIS CATCHES**: Would catch a wrong query key (`ssoId`) or missing action.
#[test]
fn given_initiate_with_hint_when_to_url_then_query_has_action_and_hint() {
    let params = ConnectParams::initiate(Some("sso-42".to_string()));

    let url = params.to_url(&relay());

    assert_eq!(url.path(), "/pairing/ws");
    assert_eq!(
        query(&url),
        vec![
            ("action".to_string(), "initiate".to_string()),
            ("ssoId".to_string(), "sso-42".to_string()),
        ]
    );
}

/// **VALUE**: Verifies a join request carries the code, the optional id and the token.
///
/// **WHY THIS MATTERS**: The relay matches the target to the origin by code and id.
///
/// **BUG THIS CATCHES**: Would catch the token or id being dropped from the query.
#[test]
fn given_join_with_token_when_to_url_then_query_has_code_id_and_wallet() {
    let params = ConnectParams::join("123456", Some("p-1".to_string()))
        .with_auth_token(Some(RedactedToken::new("secret")));

    let url = params.to_url(&relay());

    assert_eq!(params.action, Some(ConnectAction::Join));
    assert_eq!(
        query(&url),
        vec![
            ("action".to_string(), "join".to_string()),
            ("pairingCode".to_string(), "123456".to_string()),
            ("id".to_string(), "p-1".to_string()),
            ("wallet".to_string(), "secret".to_string()),
        ]
    );
}

/// **VALUE**: Verifies an empty parameter set leaves the relay URL untouched.
///
/// **WHY THIS MATTERS**: A trailing `?` changes the URL some relays route on.
///
/// **BUG THIS CATCHES**: Would catch `query_pairs_mut` being called unconditionally.
#[test]
fn given_no_params_when_to_url_then_url_has_no_query() {
    let url = ConnectParams::default().to_url(&relay());

    assert_eq!(url.query(), None);
    assert_eq!(url.as_str(), "ws://127.0.0.1:3030/pairing/ws");
}

/// **VALUE**: Verifies the log rendering never includes the raw token.
///
/// **WHY THIS MATTERS**: Connect parameters are logged at info level.
///
/// **BUG THIS CATCHES**: Would catch the Display impl printing the query string.
#[test]
fn given_token_when_displayed_then_token_is_not_leaked() {
    let params = ConnectParams::resume(RedactedToken::new("super-secret-token"));

    let rendered = params.to_string();

    assert!(!rendered.contains("super-secret-token"));
    assert!(rendered.contains("action=resume"));
    assert!(rendered.contains("token=true"));
}

use common::RedactedToken;

use std::fmt;

use url::Url;

const QUERY_ACTION: &str = "action";
const QUERY_PAIRING_CODE: &str = "pairingCode";
const QUERY_PAIRING_ID: &str = "id";
const QUERY_SESSION_HINT: &str = "ssoId";
const QUERY_AUTH_TOKEN: &str = "wallet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAction {
    Initiate,
    Join,
}

impl ConnectAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectAction::Initiate => "initiate",
            ConnectAction::Join => "join",
        }
    }
}

/// Query parameters sent when opening a relay channel.
///
/// A missing `action` means "resume": the relay identifies the pairing from
/// the auth token alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectParams {
    pub action: Option<ConnectAction>,
    pub pairing_code: Option<String>,
    pub pairing_id: Option<String>,
    pub session_hint: Option<String>,
    pub auth_token: Option<RedactedToken>,
}

impl ConnectParams {
    pub fn initiate(session_hint: Option<String>) -> Self {
        Self {
            action: Some(ConnectAction::Initiate),
            session_hint,
            ..Self::default()
        }
    }

    pub fn join(pairing_code: impl Into<String>, pairing_id: Option<String>) -> Self {
        Self {
            action: Some(ConnectAction::Join),
            pairing_code: Some(pairing_code.into()),
            pairing_id,
            ..Self::default()
        }
    }

    pub fn resume(auth_token: RedactedToken) -> Self {
        Self {
            auth_token: Some(auth_token),
            ..Self::default()
        }
    }

    pub fn with_auth_token(mut self, auth_token: Option<RedactedToken>) -> Self {
        self.auth_token = auth_token;
        self
    }

    /// Relay URL carrying these parameters in its query string.
    ///
    /// Contains the raw auth token: never log the result, log `self` instead.
    pub fn to_url(&self, relay_url: &Url) -> Url {
        let mut url = relay_url.clone();

        let pairs = [
            (QUERY_ACTION, self.action.map(ConnectAction::as_str)),
            (QUERY_PAIRING_CODE, self.pairing_code.as_deref()),
            (QUERY_PAIRING_ID, self.pairing_id.as_deref()),
            (QUERY_SESSION_HINT, self.session_hint.as_deref()),
            (
                QUERY_AUTH_TOKEN,
                self.auth_token.as_ref().map(RedactedToken::expose),
            ),
        ];

        if pairs.iter().any(|(_, value)| value.is_some()) {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                if let Some(value) = value {
                    query.append_pair(key, value);
                }
            }
        }

        url
    }
}

impl fmt::Display for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = self.action.map(ConnectAction::as_str).unwrap_or("resume");
        write!(
            f,
            "action={action} code={} id={} hint={} token={}",
            self.pairing_code.is_some(),
            self.pairing_id.as_deref().unwrap_or("-"),
            self.session_hint.is_some(),
            self.auth_token.is_some()
        )
    }
}

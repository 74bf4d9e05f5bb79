//! Session types: who is signed in, and with which token.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gavel_protocol::UserId;

use crate::UserInfo;

/// Username shown for a rehydrated token we can't read a name from.
pub const PROVISIONAL_USERNAME: &str = "me";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the [`AuthSessionManager`](crate::AuthSessionManager).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Minimum password length accepted by `register`. Checked locally.
    ///
    /// Default: 4. Values below 1 are raised to 1.
    pub min_password_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_password_len: 4,
        }
    }
}

impl SessionConfig {
    /// Returns a copy with out-of-range values clamped.
    pub fn validated(mut self) -> Self {
        self.min_password_len = self.min_password_len.max(1);
        self
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who the current token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Server-assigned id. `None` until the server has confirmed a
    /// rehydrated token.
    pub user_id: Option<UserId>,
    /// Display name.
    pub username: String,
    /// Role reported by the server, if any.
    pub role: Option<String>,
}

impl Identity {
    /// An identity confirmed by the server.
    pub fn confirmed(user: UserInfo) -> Self {
        Self {
            user_id: Some(user.id),
            username: user.username,
            role: user.role,
        }
    }

    /// A placeholder identity for a token recovered from storage.
    ///
    /// If the token is a JWT carrying a `username` (or `sub`) claim, that
    /// name is used. The signature is not checked; the name is for display
    /// until the server confirms it.
    pub fn provisional(token: &str) -> Self {
        Self {
            user_id: None,
            username: jwt_username(token)
                .unwrap_or_else(|| PROVISIONAL_USERNAME.to_owned()),
            role: None,
        }
    }

    /// `true` until the server has confirmed this identity.
    pub fn is_provisional(&self) -> bool {
        self.user_id.is_none()
    }
}

fn jwt_username(token: &str) -> Option<String> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    ["username", "sub"]
        .iter()
        .filter_map(|key| claims.get(*key)?.as_str())
        .find(|name| !name.is_empty())
        .map(str::to_owned)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The client's record of who is signed in.
///
/// `identity` is present exactly when `token` is. The constructors are the
/// only way to build one, so the two can't drift apart.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Session {
    token: Option<String>,
    identity: Option<Identity>,
}

impl Session {
    /// The signed-out session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A signed-in session.
    pub fn authenticated(token: impl Into<String>, identity: Identity) -> Self {
        Self {
            token: Some(token.into()),
            identity: Some(identity),
        }
    }

    /// A session rehydrated from a stored token.
    pub fn rehydrated(token: impl Into<String>) -> Self {
        let token = token.into();
        let identity = Identity::provisional(&token);
        Self::authenticated(token, identity)
    }

    /// The bearer token, if signed in.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The identity, if signed in.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The confirmed user id, if known.
    pub fn user_id(&self) -> Option<UserId> {
        self.identity.as_ref().and_then(|i| i.user_id)
    }

    /// `true` if a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// `true` if signed in but not yet confirmed by the server.
    pub fn is_provisional(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_provisional)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("identity", &self.identity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with(claims: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.as_bytes());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn test_anonymous_has_neither_token_nor_identity() {
        let s = Session::anonymous();
        assert!(!s.is_authenticated());
        assert!(s.identity().is_none());
        assert!(!s.is_provisional());
    }

    #[test]
    fn test_rehydrated_opaque_token_uses_placeholder_name() {
        let s = Session::rehydrated("opaque-token");
        assert!(s.is_authenticated());
        assert!(s.is_provisional());
        assert_eq!(s.identity().unwrap().username, PROVISIONAL_USERNAME);
        assert_eq!(s.user_id(), None);
    }

    #[test]
    fn test_rehydrated_jwt_reads_username_claim() {
        let token = jwt_with(r#"{"username":"alice","sub":"1"}"#);
        let s = Session::rehydrated(token);
        assert_eq!(s.identity().unwrap().username, "alice");
    }

    #[test]
    fn test_rehydrated_jwt_falls_back_to_sub_claim() {
        let token = jwt_with(r#"{"sub":"bob"}"#);
        let s = Session::rehydrated(token);
        assert_eq!(s.identity().unwrap().username, "bob");
    }

    #[test]
    fn test_confirmed_identity_is_not_provisional() {
        let s = Session::authenticated(
            "t",
            Identity::confirmed(UserInfo {
                id: UserId(5),
                username: "carol".into(),
                role: Some("user".into()),
            }),
        );
        assert!(!s.is_provisional());
        assert_eq!(s.user_id(), Some(UserId(5)));
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let s = Session::rehydrated("secret-token");
        let printed = format!("{s:?}");
        assert!(!printed.contains("secret-token"));
    }

    #[test]
    fn test_config_validated_raises_zero_password_len() {
        let config = SessionConfig {
            min_password_len: 0,
        }
        .validated();
        assert_eq!(config.min_password_len, 1);
    }
}

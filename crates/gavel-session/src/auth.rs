//! Seams between the session manager and the rest of the client.
//!
//! [`AuthBackend`] is how the manager reaches the authentication
//! endpoint. The HTTP implementation lives in `gavel-resource`; tests use
//! an in-memory fake.
//!
//! [`TokenSource`] is how everything else reaches the manager: the
//! resource client asks it for the bearer token and reports tokens the
//! server refused.

use std::fmt;
use std::future::Future;

use gavel_protocol::UserId;
use serde::Deserialize;

use crate::SessionError;

/// The user record returned by the authentication endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    /// Server-assigned id.
    #[serde(alias = "userId")]
    pub id: UserId,
    /// Account name.
    pub username: String,
    /// Role, e.g. `"user"` or `"admin"`.
    #[serde(default)]
    pub role: Option<String>,
}

/// A successful login or registration.
#[derive(Clone, Deserialize)]
pub struct AuthGrant {
    /// The bearer token to present on later calls.
    #[serde(alias = "accessToken", alias = "access_token")]
    pub token: String,
    /// Who the token belongs to.
    pub user: UserInfo,
}

impl fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGrant")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// The authentication endpoint.
///
/// # Errors
///
/// Implementations classify failures as:
/// - `login`: `InvalidCredentials`, `NetworkUnavailable`, `ServerError`
/// - `register`: `UsernameTaken`, `ValidationFailed`, `NetworkUnavailable`,
///   `ServerError`
/// - `whoami`: `Unauthorized`, `NetworkUnavailable`, `ServerError`
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges a username and password for a token.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthGrant, SessionError>> + Send;

    /// Creates an account and signs in.
    fn register(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthGrant, SessionError>> + Send;

    /// Asks the server who `token` belongs to.
    fn whoami(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<UserInfo, SessionError>> + Send;
}

/// Read access to the current bearer token, plus the forced-logout hook.
pub trait TokenSource: Send + Sync + 'static {
    /// The token to attach to the next request, if signed in.
    fn bearer(&self) -> Option<String>;

    /// Reports that the server refused `token`.
    ///
    /// Implementations sign out only if `token` is still current.
    fn on_unauthorized(&self, token: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_grant_decodes_login_response() {
        let json = r#"{
            "token": "abc",
            "tokenType": "Bearer",
            "user": {"id": "3", "username": "admin", "role": "admin"}
        }"#;
        let grant: AuthGrant = serde_json::from_str(json).unwrap();
        assert_eq!(grant.token, "abc");
        assert_eq!(grant.user.id, UserId(3));
        assert_eq!(grant.user.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_auth_grant_debug_redacts_token() {
        let grant = AuthGrant {
            token: "very-secret".into(),
            user: UserInfo {
                id: UserId(1),
                username: "a".into(),
                role: None,
            },
        };
        assert!(!format!("{grant:?}").contains("very-secret"));
    }
}

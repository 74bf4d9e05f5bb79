//! HTTP implementation of the session manager's [`AuthBackend`].
//!
//! Endpoints:
//!
//! | Call       | Request                                  | Success            |
//! |------------|------------------------------------------|--------------------|
//! | `login`    | `POST /api/login {username, password}`   | `{token, user}`    |
//! | `register` | `POST /api/register {username, password}`| `{token, user}`    |
//! | `whoami`   | `GET /api/me` with the token to confirm  | `user` or `{user}` |

use gavel_session::{AuthBackend, AuthGrant, SessionError, UserInfo};
use serde::{Deserialize, Serialize};

use crate::{Request, ResourceClient, ResourceError};

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WhoAmI {
    Wrapped { user: UserInfo },
    Bare(UserInfo),
}

/// Talks to the authentication endpoints over a [`ResourceClient`].
///
/// Give it a client *without* a token source. The session manager handles
/// `Unauthorized` from `whoami` itself, so routing it back through the
/// forced-logout hook would sign out twice.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    client: ResourceClient,
}

impl HttpAuthBackend {
    pub fn new(client: ResourceClient) -> Self {
        Self { client }
    }

    async fn exchange(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthGrant, ResourceError> {
        let request = Request::post(path).json(&Credentials { username, password })?;
        self.client.send_as(request).await
    }
}

impl AuthBackend for HttpAuthBackend {
    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthGrant, SessionError> {
        self.exchange("/api/login", username, password)
            .await
            .map_err(|e| match e {
                ResourceError::Unauthorized => SessionError::InvalidCredentials,
                other => to_session_error(other),
            })
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthGrant, SessionError> {
        self.exchange("/api/register", username, password)
            .await
            .map_err(|e| match e {
                ResourceError::Conflict(_) => SessionError::UsernameTaken,
                other => to_session_error(other),
            })
    }

    async fn whoami(&self, token: &str) -> Result<UserInfo, SessionError> {
        let reply: WhoAmI = self
            .client
            .send_as(Request::get("/api/me").bearer(token))
            .await
            .map_err(to_session_error)?;
        Ok(match reply {
            WhoAmI::Wrapped { user } | WhoAmI::Bare(user) => user,
        })
    }
}

fn to_session_error(error: ResourceError) -> SessionError {
    match error {
        ResourceError::Unauthorized => SessionError::Unauthorized,
        ResourceError::ValidationFailed(msg) => SessionError::ValidationFailed(msg),
        ResourceError::NetworkUnavailable(msg) => {
            SessionError::NetworkUnavailable(msg)
        }
        ResourceError::ServerError(msg) | ResourceError::Conflict(msg) => {
            SessionError::ServerError(msg)
        }
        ResourceError::NotFound => {
            SessionError::ServerError("authentication endpoint not found".into())
        }
    }
}

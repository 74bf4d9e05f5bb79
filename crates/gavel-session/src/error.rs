//! Error types for the session layer.

/// Errors that can occur while signing in, registering, or confirming a
/// session.
///
/// Credential storage never shows up here: a failing store degrades to
/// memory instead of surfacing an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The server rejected the username/password pair.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Registration failed because the username already exists.
    #[error("username is already taken")]
    UsernameTaken,

    /// The input was rejected, either locally before any network call or
    /// by the server.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The presented token is no longer accepted by the server.
    #[error("unauthorized")]
    Unauthorized,

    /// The server could not be reached.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The server answered with something we can't use.
    #[error("server error: {0}")]
    ServerError(String),
}

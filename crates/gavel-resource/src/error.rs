//! Error types for the resource layer.

/// How a request to the REST API failed.
///
/// Every non-2xx response and every transport failure lands in exactly one
/// of these. Messages are the server's own reason text where it sent one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// 401/403, or an owner-scoped call made while signed out.
    #[error("unauthorized")]
    Unauthorized,

    /// 404.
    #[error("not found")]
    NotFound,

    /// 409.
    #[error("conflict: {0}")]
    Conflict(String),

    /// 400, 422, or any other 4xx.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// 5xx, or a 2xx whose body isn't what we expected.
    #[error("server error: {0}")]
    ServerError(String),

    /// Connect failure, timeout, or a dropped connection.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),
}

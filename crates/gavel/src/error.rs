//! Unified error type for the Gavel client.

use gavel_resource::ResourceError;
use gavel_room::RoomError;
use gavel_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls the
/// `?` operator needs, so facade methods can mix calls into every layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GavelError {
    /// Sign-in, registration or session confirmation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A REST call failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A local room operation was refused.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The operation needs a signed-in user with a known id.
    #[error("not signed in")]
    NotAuthenticated,

    /// The room view was closed or replaced while the request was in
    /// flight; its result was dropped.
    #[error("room view is no longer current")]
    StaleView,

    /// The client configuration can't be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GavelError {
    /// Returns `true` for errors that mean the user must sign in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated
                | Self::Session(SessionError::Unauthorized)
                | Self::Resource(ResourceError::Unauthorized)
        )
    }
}

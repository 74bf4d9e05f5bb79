//! Authentication session management for Gavel.
//!
//! This crate owns the answer to "who is signed in, and with which token":
//!
//! 1. **Persistence**: the token survives restarts ([`CredentialStore`],
//!    [`FileCredentialStore`], [`MemoryCredentialStore`])
//! 2. **Session state**: one [`Session`] behind the
//!    [`AuthSessionManager`], read as `Arc<Session>` snapshots
//! 3. **Seams**: [`AuthBackend`] (how the manager reaches the server) and
//!    [`TokenSource`] (how the rest of the client reaches the manager)
//!
//! # How it fits in the stack
//!
//! ```text
//! Resource client / room views (above)  ← ask for the bearer, report 401s
//!     ↕
//! Session layer (this crate)  ← login, logout, rehydration, forced logout
//!     ↕
//! Protocol layer (below)  ← provides UserId
//! ```

mod auth;
mod error;
mod manager;
mod session;
mod store;

pub use auth::{AuthBackend, AuthGrant, TokenSource, UserInfo};
pub use error::SessionError;
pub use manager::AuthSessionManager;
pub use session::{Identity, PROVISIONAL_USERNAME, Session, SessionConfig};
pub use store::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, TOKEN_KEY,
};

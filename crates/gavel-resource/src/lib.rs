//! REST access for Gavel.
//!
//! - [`ResourceClient`] sends a [`Request`], attaches the bearer token,
//!   and classifies the answer into a [`ResourceError`] kind.
//! - [`HttpAuthBackend`] implements the session manager's `AuthBackend`.
//! - [`ProductApi`] and [`RoomApi`] wrap the product and room endpoints,
//!   decoding payloads into the types in this crate.
//!
//! A 401/403 from any call made with the session token signs the session
//! out before the error reaches the caller.

mod auth;
mod client;
mod error;
mod models;
mod products;
mod rooms;

pub use auth::HttpAuthBackend;
pub use client::{DEFAULT_TIMEOUT, Method, Request, ResourceClient};
pub use error::ResourceError;
pub use models::{
    BidReceipt, BuyNowReceipt, Product, ProductDraft, Room, RoomDraft,
};
pub use products::ProductApi;
pub use rooms::RoomApi;

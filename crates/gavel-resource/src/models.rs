//! Payload shapes for the product and room endpoints.
//!
//! The backends disagree on names (`roomName` vs `name`, `startPrice` vs
//! `basePrice`), send ids as numbers or strings, and send prices as
//! integers or floats. Every variant is absorbed here so nothing above
//! this module has to guess.

use gavel_protocol::{LotId, RoomId, RoomStatus, UserId};
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Amount decoding
// ---------------------------------------------------------------------------

/// Reads a money amount from an integer, a whole-ish float, or a numeric
/// string. Floats are rounded to the nearest unit.
fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

fn optional_amount<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    Option::<Lenient>::deserialize(deserializer).map(|v| v.map(|l| l.0))
}

struct Lenient(u64);

impl<'de> Deserialize<'de> for Lenient {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        amount(d).map(Lenient)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative amount")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
        if v.is_finite() && v >= 0.0 && v <= u64::MAX as f64 {
            Ok(v.round() as u64)
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        let trimmed = v.trim();
        if let Ok(n) = trimmed.parse::<u64>() {
            return Ok(n);
        }
        match trimmed.parse::<f64>() {
            Ok(f) => self.visit_f64(f),
            Err(_) => Err(E::invalid_value(Unexpected::Str(v), &self)),
        }
    }
}

fn default_step() -> u64 {
    1
}

fn default_success() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// A product as listed by the API. Products are auctioned as lots and
/// share their ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    #[serde(alias = "productId")]
    pub id: LotId,
    pub name: String,
    #[serde(
        alias = "startPrice",
        alias = "basePrice",
        alias = "base_price",
        deserialize_with = "amount"
    )]
    pub start_price: u64,
    #[serde(
        default,
        alias = "buyPrice",
        deserialize_with = "optional_amount"
    )]
    pub buy_price: Option<u64>,
    #[serde(
        default = "default_step",
        alias = "step",
        alias = "minStep",
        deserialize_with = "amount"
    )]
    pub min_step: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub start_price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_price: Option<u64>,
    #[serde(rename = "step")]
    pub min_step: u64,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

fn default_status() -> RoomStatus {
    RoomStatus::Waiting
}

/// An auction room as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Room {
    #[serde(alias = "roomId")]
    pub id: RoomId,
    #[serde(alias = "roomName", alias = "room_name")]
    pub name: String,
    #[serde(default, alias = "productId")]
    pub product_id: Option<LotId>,
    #[serde(default, alias = "hostUserId", alias = "hostId")]
    pub host_user_id: Option<UserId>,
    #[serde(
        default,
        alias = "basePrice",
        alias = "startPrice",
        alias = "start_price",
        deserialize_with = "amount"
    )]
    pub base_price: u64,
    #[serde(default, alias = "currentPrice", deserialize_with = "amount")]
    pub current_price: u64,
    #[serde(default, alias = "duration", alias = "durationSeconds")]
    pub duration_secs: u64,
    #[serde(default = "default_status")]
    pub status: RoomStatus,
}

/// Body for creating a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDraft {
    pub room_name: String,
    pub product_id: LotId,
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    pub base_price: u64,
}

// ---------------------------------------------------------------------------
// Command results
// ---------------------------------------------------------------------------

/// The id returned by a create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct Created {
    #[serde(
        alias = "roomId",
        alias = "productId",
        deserialize_with = "gavel_protocol::deserialize_id"
    )]
    pub id: u64,
}

/// The server's answer to a bid.
///
/// A 2xx reply still carries `success`; a refused bid normally comes back
/// as 400 and never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BidReceipt {
    #[serde(alias = "roomId")]
    pub room_id: RoomId,
    #[serde(alias = "highestBid", deserialize_with = "amount")]
    pub highest_bid: u64,
    #[serde(default, alias = "highestBidderId")]
    pub highest_bidder_id: Option<UserId>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// The server's answer to a buy-now request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuyNowReceipt {
    #[serde(alias = "roomId")]
    pub room_id: RoomId,
    #[serde(default, alias = "buyerId")]
    pub buyer_id: Option<UserId>,
    #[serde(alias = "finalPrice", deserialize_with = "amount")]
    pub final_price: u64,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// A list response: either a bare array or an object wrapping one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "rooms", alias = "products", alias = "data")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
        }
    }
}

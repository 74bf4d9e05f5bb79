//! Room endpoints, including bidding.

use gavel_protocol::RoomId;
use serde_json::json;

use crate::models::{Created, Listing};
use crate::{
    BidReceipt, BuyNowReceipt, Request, ResourceClient, ResourceError, Room,
    RoomDraft,
};

/// Room CRUD and auction commands over a [`ResourceClient`].
///
/// Everything except `list_all` and `get` needs a session and fails
/// locally with `Unauthorized` without one.
#[derive(Debug, Clone)]
pub struct RoomApi {
    client: ResourceClient,
}

impl RoomApi {
    pub fn new(client: ResourceClient) -> Self {
        Self { client }
    }

    /// `GET /api/rooms`
    pub async fn list_all(&self) -> Result<Vec<Room>, ResourceError> {
        let listing: Listing<Room> =
            self.client.send_as(Request::get("/api/rooms")).await?;
        Ok(listing.into_vec())
    }

    /// `GET /api/rooms/{id}`
    pub async fn get(&self, id: RoomId) -> Result<Room, ResourceError> {
        self.client
            .send_as(Request::get(format!("/api/rooms/{}", id.0)))
            .await
    }

    /// `GET /api/me/rooms`
    pub async fn list_mine(&self) -> Result<Vec<Room>, ResourceError> {
        self.client.require_session()?;
        let listing: Listing<Room> =
            self.client.send_as(Request::get("/api/me/rooms")).await?;
        Ok(listing.into_vec())
    }

    /// `GET /api/me/rooms/{id}`
    pub async fn get_mine(&self, id: RoomId) -> Result<Room, ResourceError> {
        self.client.require_session()?;
        self.client
            .send_as(Request::get(format!("/api/me/rooms/{}", id.0)))
            .await
    }

    /// `POST /api/me/rooms`; returns the new room's id.
    pub async fn create(&self, draft: &RoomDraft) -> Result<RoomId, ResourceError> {
        self.client.require_session()?;
        let created: Created = self
            .client
            .send_as(Request::post("/api/me/rooms").json(draft)?)
            .await?;
        Ok(RoomId(created.id))
    }

    /// `DELETE /api/me/rooms/{id}`
    pub async fn delete(&self, id: RoomId) -> Result<(), ResourceError> {
        self.client.require_session()?;
        self.client
            .send(Request::delete(format!("/api/me/rooms/{}", id.0)))
            .await
            .map(drop)
    }

    /// `POST /api/me/rooms/{id}/start`
    pub async fn start(&self, id: RoomId) -> Result<(), ResourceError> {
        self.command(format!("/api/me/rooms/{}/start", id.0)).await
    }

    /// `POST /api/me/rooms/{id}/cancel`
    pub async fn cancel(&self, id: RoomId) -> Result<(), ResourceError> {
        self.command(format!("/api/me/rooms/{}/cancel", id.0)).await
    }

    /// `POST /api/rooms/{id}/bid` with `{amount}`.
    ///
    /// The receipt is informational; the room's state changes only when
    /// the matching `bid_accepted` arrives on the push stream.
    pub async fn place_bid(
        &self,
        id: RoomId,
        amount: u64,
    ) -> Result<BidReceipt, ResourceError> {
        self.client.require_session()?;
        let request = Request::post(format!("/api/rooms/{}/bid", id.0))
            .json(&json!({ "amount": amount }))?;
        self.client.send_as(request).await
    }

    /// `POST /api/rooms/{id}/buy` with `{price}`.
    pub async fn buy_now(
        &self,
        id: RoomId,
        price: u64,
    ) -> Result<BuyNowReceipt, ResourceError> {
        self.client.require_session()?;
        let request = Request::post(format!("/api/rooms/{}/buy", id.0))
            .json(&json!({ "price": price }))?;
        self.client.send_as(request).await
    }

    async fn command(&self, path: String) -> Result<(), ResourceError> {
        self.client.require_session()?;
        self.client.send(Request::post(path)).await.map(drop)
    }
}

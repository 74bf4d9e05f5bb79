//! Product endpoints.
//!
//! Owner-scoped calls (`/api/me/products...`) check for a session first
//! and fail with `Unauthorized` without a network call when signed out.

use gavel_protocol::LotId;
use serde_json::json;

use crate::models::{Created, Listing};
use crate::{Product, ProductDraft, Request, ResourceClient, ResourceError};

/// Product CRUD over a [`ResourceClient`].
#[derive(Debug, Clone)]
pub struct ProductApi {
    client: ResourceClient,
}

impl ProductApi {
    pub fn new(client: ResourceClient) -> Self {
        Self { client }
    }

    /// `GET /api/products`
    pub async fn list_all(&self) -> Result<Vec<Product>, ResourceError> {
        let listing: Listing<Product> =
            self.client.send_as(Request::get("/api/products")).await?;
        Ok(listing.into_vec())
    }

    /// `GET /api/products/{id}`
    pub async fn get(&self, id: LotId) -> Result<Product, ResourceError> {
        self.client
            .send_as(Request::get(format!("/api/products/{}", id.0)))
            .await
    }

    /// `GET /api/me/products`
    pub async fn list_mine(&self) -> Result<Vec<Product>, ResourceError> {
        self.client.require_session()?;
        let listing: Listing<Product> =
            self.client.send_as(Request::get("/api/me/products")).await?;
        Ok(listing.into_vec())
    }

    /// `GET /api/me/products/{id}`
    pub async fn get_mine(&self, id: LotId) -> Result<Product, ResourceError> {
        self.client.require_session()?;
        self.client
            .send_as(Request::get(format!("/api/me/products/{}", id.0)))
            .await
    }

    /// `POST /api/me/products`; returns the new product's id.
    pub async fn create(
        &self,
        draft: &ProductDraft,
    ) -> Result<LotId, ResourceError> {
        self.client.require_session()?;
        let created: Created = self
            .client
            .send_as(Request::post("/api/me/products").json(draft)?)
            .await?;
        Ok(LotId(created.id))
    }

    /// `PUT /api/me/products/{id}`
    pub async fn update(
        &self,
        id: LotId,
        draft: &ProductDraft,
    ) -> Result<(), ResourceError> {
        self.client.require_session()?;
        let request =
            Request::put(format!("/api/me/products/{}", id.0)).json(draft)?;
        self.client.send(request).await.map(drop)
    }

    /// `DELETE /api/me/products/{id}`
    pub async fn delete(&self, id: LotId) -> Result<(), ResourceError> {
        self.client.require_session()?;
        self.client
            .send(Request::delete(format!("/api/me/products/{}", id.0)))
            .await
            .map(drop)
    }

    /// `PATCH /api/me/products/{id}/status` with `{status}`.
    pub async fn change_status(
        &self,
        id: LotId,
        status: &str,
    ) -> Result<(), ResourceError> {
        self.client.require_session()?;
        let request = Request::patch(format!("/api/me/products/{}/status", id.0))
            .json(&json!({ "status": status }))?;
        self.client.send(request).await.map(drop)
    }
}

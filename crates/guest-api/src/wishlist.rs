//! Typed adapter for the wishlist endpoints.

use crate::client::ApiClient;
use crate::error::ApiResult;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Which side of the couple a wish belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Bride,
    Groom,
}

/// A single wishlist entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WishlistItem {
    pub uuid: String,
    pub wish_id: String,
    pub item: String,
    #[serde(default)]
    pub link: Option<String>,
    pub owner_type: OwnerType,
    /// UUID of the guest who reserved the item, if anyone
    #[serde(default)]
    pub user_uuid: Option<String>,
    pub created_at: String,
}

impl WishlistItem {
    /// Whether the calling guest holds the reservation.
    pub fn reserved_by(&self, current_user_uuid: Option<&str>) -> bool {
        match (&self.user_uuid, current_user_uuid) {
            (Some(owner), Some(me)) => owner == me,
            _ => false,
        }
    }
}

/// Both halves of the wishlist plus the caller's identity for reservation
/// checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Wishlist {
    #[serde(default)]
    pub bride_items: Vec<WishlistItem>,
    #[serde(default)]
    pub groom_items: Vec<WishlistItem>,
    #[serde(default)]
    pub current_user_uuid: Option<String>,
}

#[derive(Clone)]
pub struct WishlistApi {
    client: Arc<ApiClient>,
}

impl WishlistApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> ApiResult<Wishlist> {
        let response = self.client.get("wishlist/").await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to load wishlist"));
        }
        response.json()
    }

    pub async fn reserve(&self, wishlist_uuid: &str) -> ApiResult<()> {
        let response = self
            .client
            .post("wishlist/reserve", json!({ "wishlist_uuid": wishlist_uuid }))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to reserve item"));
        }
        Ok(())
    }

    pub async fn unreserve(&self, wishlist_uuid: &str) -> ApiResult<()> {
        let response = self
            .client
            .post(
                "wishlist/unreserve",
                json!({ "wishlist_uuid": wishlist_uuid }),
            )
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to release item"));
        }
        Ok(())
    }
}

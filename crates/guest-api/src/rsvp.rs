//! Typed adapter for the RSVP endpoints.

use crate::client::ApiClient;
use crate::error::ApiResult;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Current RSVP answer. `None` means the guest has not answered yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RsvpStatus {
    #[serde(default)]
    pub rsvp: Option<bool>,
}

#[derive(Clone)]
pub struct RsvpApi {
    client: Arc<ApiClient>,
}

impl RsvpApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> ApiResult<RsvpStatus> {
        let response = self.client.get("rsvp/").await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to load RSVP"));
        }
        response.json()
    }

    pub async fn save(&self, attending: bool) -> ApiResult<()> {
        let response = self.client.post("rsvp/", json!({ "rsvp": attending })).await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to save RSVP"));
        }
        Ok(())
    }
}

//! Typed adapter for the menu-preferences endpoints.

use crate::client::ApiClient;
use crate::error::ApiResult;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Choices offered by the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormOptions {
    #[serde(default)]
    pub food_choices: Vec<String>,
    #[serde(default)]
    pub alcohol_choices: Vec<String>,
}

/// The guest's saved preferences.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub food_preference: Option<String>,
    #[serde(default)]
    pub alcohol_preferences: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

#[derive(Clone)]
pub struct PreferencesApi {
    client: Arc<ApiClient>,
}

impl PreferencesApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn form_options(&self) -> ApiResult<FormOptions> {
        let response = self.client.get("preferences/form-options").await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to load form options"));
        }
        response.json()
    }

    pub async fn get(&self) -> ApiResult<Preferences> {
        let response = self.client.get("preferences/").await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to load preferences"));
        }
        response.json()
    }

    pub async fn save_food(&self, food_choice: &str) -> ApiResult<()> {
        let response = self
            .client
            .post("preferences/food", json!({ "food_choice": food_choice }))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to save food choice"));
        }
        Ok(())
    }

    pub async fn save_alcohol(&self, alcohol_choices: &[String]) -> ApiResult<()> {
        let response = self
            .client
            .post(
                "preferences/alcohol",
                json!({ "alcohol_choices": alcohol_choices }),
            )
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to save alcohol choices"));
        }
        Ok(())
    }

    pub async fn add_allergen(&self, allergen: &str) -> ApiResult<()> {
        let response = self
            .client
            .post("preferences/allergies", json!({ "allergen": allergen }))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to add allergen"));
        }
        Ok(())
    }

    pub async fn remove_allergen(&self, allergen: &str) -> ApiResult<()> {
        let response = self
            .client
            .delete("preferences/allergies", json!({ "allergen": allergen }))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to remove allergen"));
        }
        Ok(())
    }
}

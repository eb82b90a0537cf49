//! Authenticated API client with a single 401-retry.

use crate::error::ApiResult;
use crate::transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};
use futures_util::future::BoxFuture;
use guest_storage::TokenStore;
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// Callback that runs the token refresh procedure and reports whether a new
/// access token is now in the store. Installed by the session manager after
/// construction.
pub type RefreshHandler = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// Client for authenticated backend endpoints.
///
/// Attaches the stored access token as a bearer credential and owns the
/// whole 401 recovery policy: on a 401 (and only then) it invokes the
/// refresh handler once, re-reads the token, and re-issues the request
/// once. The second response is returned as-is, so a repeated 401 surfaces
/// to the caller instead of looping.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
    refresh_handler: RwLock<Option<RefreshHandler>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, tokens: TokenStore) -> Self {
        Self {
            transport,
            tokens,
            refresh_handler: RwLock::new(None),
        }
    }

    /// Install the refresh handler. Until one is installed a 401 is
    /// returned to the caller unchanged.
    pub fn set_refresh_handler(&self, handler: RefreshHandler) {
        let mut guard = self.refresh_handler.write().unwrap();
        *guard = Some(handler);
    }

    /// Issue a request, attaching the stored access token unless
    /// `skip_auth`. This is the only place the 401 retry happens.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        skip_auth: bool,
    ) -> ApiResult<ApiResponse> {
        let bearer = if skip_auth {
            None
        } else {
            self.tokens.access_token()?
        };

        let request = ApiRequest {
            method,
            path: path.to_string(),
            body: body.clone(),
            bearer,
        };
        let response = self.transport.execute(request).await?;

        if response.status != 401 || skip_auth {
            return Ok(response);
        }

        let handler = self.refresh_handler.read().unwrap().clone();
        let Some(handler) = handler else {
            return Ok(response);
        };

        tracing::debug!(path, "Access token rejected, refreshing");
        if !handler().await {
            tracing::debug!(path, "Refresh failed, returning original response");
            return Ok(response);
        }

        let retry = ApiRequest {
            method,
            path: path.to_string(),
            body,
            bearer: self.tokens.access_token()?,
        };
        self.transport.execute(retry).await
    }

    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(HttpMethod::Get, path, None, false).await
    }

    pub async fn post(&self, path: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(HttpMethod::Post, path, Some(body), false).await
    }

    pub async fn delete(&self, path: &str, body: Value) -> ApiResult<ApiResponse> {
        self.request(HttpMethod::Delete, path, Some(body), false)
            .await
    }
}

//! Request/response types and the HTTP transport seam.

use crate::error::{ApiError, ApiResult};
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// HTTP methods the backend contract uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A request to the backend, relative to the API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    /// JSON body, sent with a JSON content type when present
    pub body: Option<Value>,
    /// Access token to attach as a bearer credential
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body),
            bearer: None,
        }
    }

}

/// A backend response: status code plus the parsed JSON body.
///
/// Non-success statuses are returned as responses, not errors, so callers
/// can inspect the status (the 401 retry path depends on this). Transport
/// errors (connect, timeout) are the only `Err` path.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body into a typed DTO.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Extract a readable message from the backend's `detail` field.
    ///
    /// The backend sends either a plain string or a validation-error array
    /// whose entries carry a `msg` field.
    pub fn detail(&self) -> Option<String> {
        match &self.body["detail"] {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items
                .first()
                .and_then(|item| item["msg"].as_str())
                .map(String::from),
            _ => None,
        }
    }

    /// Build the error for a non-success response, preferring the backend's
    /// `detail` message over the fallback.
    pub fn status_error(&self, fallback: &str) -> ApiError {
        ApiError::Status {
            status: self.status,
            message: self.detail().unwrap_or_else(|| fallback.to_string()),
        }
    }
}

/// Trait for executing backend requests.
///
/// The seam between the API layer and the network: production uses
/// [`ReqwestTransport`], tests script responses and count calls.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: ApiRequest) -> BoxFuture<'static, ApiResult<ApiResponse>>;
}

/// Transport backed by a shared reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport for the given API base URL
    /// (e.g. `https://wedding.example.com/api`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: ApiRequest) -> BoxFuture<'static, ApiResult<ApiResponse>> {
        let client = self.client.clone();
        let url = self.url(&request.path);

        Box::pin(async move {
            tracing::debug!(method = request.method.as_str(), url = %url, "API request");

            let mut builder = match request.method {
                HttpMethod::Get => client.get(&url),
                HttpMethod::Post => client.post(&url),
                HttpMethod::Delete => client.delete(&url),
            };
            if let Some(token) = &request.bearer {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            // Some endpoints answer with an empty body; treat that as null
            // rather than a decode failure.
            let body = response.json::<Value>().await.unwrap_or(Value::Null);

            tracing::debug!(status, url = %url, "API response");
            Ok(ApiResponse { status, body })
        })
    }
}

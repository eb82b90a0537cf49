//! API error types.

use thiserror::Error;

/// Error type for backend API operations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the backend
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// Storage error while reading the stored token
    #[error("Storage error: {0}")]
    Storage(#[from] guest_storage::StorageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    /// Returns true if this error is transient and the operation can be
    /// retried: connection failures, timeouts, and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

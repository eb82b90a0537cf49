//! Session error types.

use thiserror::Error;

/// Error type for session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Phone number could not be normalized to +7XXXXXXXXXX
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    /// Operation requires an authenticated session
    #[error("Not logged in")]
    NotLoggedIn,

    /// No phone verification is in progress
    #[error("No verification in progress")]
    NoVerification,

    /// Backend rejected the credentials during login
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// OAuth flow error with a user-facing message
    #[error("{0}")]
    OAuth(String),

    /// Redirect carried a state nonce that does not match the stored one
    #[error("OAuth state mismatch, possible request forgery")]
    StateMismatch,

    /// No provider redirect arrived before the deadline
    #[error("Timed out waiting for the provider redirect")]
    CallbackTimeout,

    /// Invalid transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] guest_storage::StorageError),

    /// API error
    #[error("API error: {0}")]
    Api(#[from] guest_api::ApiError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;

//! Key/value storage abstraction for the wedding guest client.
//!
//! This crate provides the two storage scopes the client needs:
//! - **Persistent**: a JSON file on disk ([`FileStorage`]) holding the
//!   credential pair and the in-progress phone-verification state, so a
//!   guest who restarts mid-flow does not lose their place.
//! - **Session-scoped**: an in-memory map ([`MemoryStorage`]) holding the
//!   one-shot OAuth handshake (PKCE verifier + state nonce).

mod file;
mod handshake;
mod keys;
mod memory;
mod tokens;
mod traits;

pub use file::FileStorage;
pub use handshake::{HandshakeStore, OAuthHandshake};
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use tokens::{CredentialPair, TokenStore, VerificationAttempt};
pub use traits::SecureStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

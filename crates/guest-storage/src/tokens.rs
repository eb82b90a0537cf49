//! High-level API over persistent storage: credential pair and
//! verification state.

use crate::{SecureStorage, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An access/refresh token pair.
///
/// The two tokens are a unit: they are always written together and cleared
/// together. An access token is never persisted without its paired refresh
/// token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// An in-progress phone verification, persisted so a restart mid-flow
/// resumes where the guest left off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationAttempt {
    /// Normalized phone number (`+7XXXXXXXXXX`)
    pub phone: String,
    /// Whether the code call was already requested
    pub code_requested: bool,
}

/// High-level API for the persistent guest state.
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn SecureStorage>,
}

impl TokenStore {
    /// Create a token store over the given backend.
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Credential pair
    // ==========================================

    /// Retrieve the stored access token.
    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    /// Retrieve the stored refresh token.
    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    /// Retrieve the credential pair, or `None` if either half is missing.
    pub fn credentials(&self) -> StorageResult<Option<CredentialPair>> {
        let access = self.storage.get(StorageKeys::ACCESS_TOKEN)?;
        let refresh = self.storage.get(StorageKeys::REFRESH_TOKEN)?;
        match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => Ok(Some(CredentialPair {
                access_token,
                refresh_token,
            })),
            _ => Ok(None),
        }
    }

    /// Store both halves of the credential pair.
    pub fn store_credentials(&self, pair: &CredentialPair) -> StorageResult<()> {
        self.storage
            .set(StorageKeys::ACCESS_TOKEN, &pair.access_token)?;
        self.storage
            .set(StorageKeys::REFRESH_TOKEN, &pair.refresh_token)?;
        Ok(())
    }

    /// Clear both halves of the credential pair.
    pub fn clear_credentials(&self) -> StorageResult<()> {
        let _ = self.storage.delete(StorageKeys::ACCESS_TOKEN);
        let _ = self.storage.delete(StorageKeys::REFRESH_TOKEN);
        Ok(())
    }

    /// Check whether a complete credential pair is stored.
    pub fn has_credentials(&self) -> StorageResult<bool> {
        Ok(self.credentials()?.is_some())
    }

    // ==========================================
    // Verification attempt
    // ==========================================

    /// Persist an in-progress verification attempt.
    pub fn store_verification(&self, phone: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::VERIFICATION_PHONE, phone)?;
        self.storage
            .set(StorageKeys::VERIFICATION_CODE_SENT, "true")?;
        Ok(())
    }

    /// Retrieve the in-progress verification attempt, if any.
    pub fn verification(&self) -> StorageResult<Option<VerificationAttempt>> {
        let phone = match self.storage.get(StorageKeys::VERIFICATION_PHONE)? {
            Some(p) => p,
            None => return Ok(None),
        };
        let code_requested = self
            .storage
            .get(StorageKeys::VERIFICATION_CODE_SENT)?
            .as_deref()
            == Some("true");
        Ok(Some(VerificationAttempt {
            phone,
            code_requested,
        }))
    }

    /// Remove the verification attempt (successful verification, explicit
    /// cancellation, or logout).
    pub fn clear_verification(&self) -> StorageResult<()> {
        let _ = self.storage.delete(StorageKeys::VERIFICATION_PHONE);
        let _ = self.storage.delete(StorageKeys::VERIFICATION_CODE_SENT);
        Ok(())
    }
}

//! Session-scoped storage for the one-shot OAuth handshake.

use crate::{SecureStorage, StorageKeys, StorageResult};
use std::sync::Arc;

/// The state nonce and PKCE verifier generated when an authorization flow
/// begins. Both are consumed together when the callback arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthHandshake {
    pub state: String,
    pub code_verifier: String,
}

/// Stores the in-flight OAuth handshake.
///
/// A handshake is single use: `take` removes both values regardless of what
/// the caller does with them afterwards, so a replayed callback finds
/// nothing to match against.
#[derive(Clone)]
pub struct HandshakeStore {
    storage: Arc<dyn SecureStorage>,
}

impl HandshakeStore {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    /// Record a new handshake, replacing any previous one.
    pub fn store(&self, handshake: &OAuthHandshake) -> StorageResult<()> {
        self.storage.set(StorageKeys::OAUTH_STATE, &handshake.state)?;
        self.storage
            .set(StorageKeys::OAUTH_CODE_VERIFIER, &handshake.code_verifier)?;
        Ok(())
    }

    /// Remove and return the stored handshake, if any.
    pub fn take(&self) -> StorageResult<Option<OAuthHandshake>> {
        let state = self.storage.get(StorageKeys::OAUTH_STATE)?;
        let code_verifier = self.storage.get(StorageKeys::OAUTH_CODE_VERIFIER)?;
        let _ = self.storage.delete(StorageKeys::OAUTH_STATE);
        let _ = self.storage.delete(StorageKeys::OAUTH_CODE_VERIFIER);
        match (state, code_verifier) {
            (Some(state), Some(code_verifier)) => Ok(Some(OAuthHandshake {
                state,
                code_verifier,
            })),
            _ => Ok(None),
        }
    }
}

//! Phone-number login: normalization and the code verification flow.

use crate::error::{SessionError, SessionResult};
use crate::session::SessionManager;
use guest_storage::VerificationAttempt;
use tracing::info;

/// Normalize a Russian phone number to `+7XXXXXXXXXX`.
///
/// Accepts the common input shapes: `8 (999) 123-45-67`, `+7 999 ...`,
/// or a bare ten-digit number. Anything that does not reduce to eleven
/// digits starting with 7 is rejected.
pub fn normalize_phone(input: &str) -> SessionResult<String> {
    let mut digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 11 && digits.starts_with('8') {
        digits.replace_range(0..1, "7");
    } else if digits.len() == 10 {
        digits.insert(0, '7');
    }

    if digits.len() == 11 && digits.starts_with('7') {
        Ok(format!("+{digits}"))
    } else {
        Err(SessionError::InvalidPhone(input.to_string()))
    }
}

impl SessionManager {
    /// Ask the backend to send a verification code.
    ///
    /// The attempt is persisted so an interrupted flow resumes at the
    /// code-entry step instead of sending a second SMS. Returns the
    /// normalized phone number.
    pub async fn send_verification_code(&self, phone: &str) -> SessionResult<String> {
        let normalized = normalize_phone(phone)?;
        self.auth.send_code(&normalized).await?;
        self.tokens.store_verification(&normalized)?;
        info!(phone = %normalized, "Verification code requested");
        Ok(normalized)
    }

    /// Exchange the received code for a credential pair and log in.
    pub async fn verify_code(&self, code: &str) -> SessionResult<()> {
        let attempt = self
            .tokens
            .verification()?
            .ok_or(SessionError::NoVerification)?;

        let pair = self.auth.verify_code(&attempt.phone, code).await?;
        self.login(&pair.access_token, &pair.refresh_token).await?;
        self.tokens.clear_verification()?;
        Ok(())
    }

    /// The persisted verification attempt, if one is in progress.
    pub fn pending_verification(&self) -> SessionResult<Option<VerificationAttempt>> {
        Ok(self.tokens.verification()?)
    }

    /// Abandon the in-progress verification attempt.
    pub fn cancel_verification(&self) -> SessionResult<()> {
        self.tokens.clear_verification()?;
        Ok(())
    }
}

//! Storage key constants.

/// Storage keys used by the guest client.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token (persistent, paired with the refresh token)
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Refresh token (persistent, paired with the access token)
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Phone number of an in-progress verification attempt
    pub const VERIFICATION_PHONE: &'static str = "verification_phone";

    /// Whether a verification code was already requested ("true"/"false")
    pub const VERIFICATION_CODE_SENT: &'static str = "verification_code_sent";

    /// OAuth CSRF state nonce (session-scoped, single use)
    pub const OAUTH_STATE: &'static str = "oauth_state";

    /// PKCE code verifier (session-scoped, single use)
    pub const OAUTH_CODE_VERIFIER: &'static str = "oauth_code_verifier";
}

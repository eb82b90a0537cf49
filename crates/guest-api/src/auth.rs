//! Typed adapter for the auth endpoints.
//!
//! Every auth call skips bearer attachment: the backend takes the relevant
//! token as a JSON body field. The validate endpoint in particular wants
//! `{access_token}` in the body even though every business endpoint reads a
//! bearer header. That inconsistency is the backend's contract and is
//! preserved here.

use crate::error::ApiResult;
use crate::transport::{ApiRequest, HttpTransport};
use guest_storage::CredentialPair;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Answer from `auth/validate`. `phone` and `friend` are only present when
/// the token is valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub friend: bool,
}

/// Publicly served client configuration (OAuth client ids).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub vk_client_id: Option<String>,
    #[serde(default)]
    pub yandex_client_id: Option<String>,
}

/// Adapter for `auth/*` and `config`.
#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<dyn HttpTransport>,
}

impl AuthApi {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Request a verification code for a phone number.
    pub async fn send_code(&self, phone: &str) -> ApiResult<()> {
        let response = self
            .transport
            .execute(ApiRequest::post("auth/send-code", json!({ "phone": phone })))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to send verification code"));
        }
        Ok(())
    }

    /// Exchange a phone number and verification code for a credential pair.
    pub async fn verify_code(&self, phone: &str, code: &str) -> ApiResult<CredentialPair> {
        let response = self
            .transport
            .execute(ApiRequest::post(
                "auth/verify-code",
                json!({ "phone": phone, "code": code }),
            ))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Invalid verification code"));
        }
        response.json()
    }

    /// Check whether an access token is still accepted.
    ///
    /// Any reachable-server answer is an answer: a non-success status
    /// parses as `valid: false` rather than an error, so only transport
    /// failures surface as `Err`.
    pub async fn validate(&self, access_token: &str) -> ApiResult<ValidateResponse> {
        let response = self
            .transport
            .execute(ApiRequest::post(
                "auth/validate",
                json!({ "access_token": access_token }),
            ))
            .await?;
        Ok(response.json().unwrap_or_default())
    }

    /// Exchange a refresh token for a new credential pair.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<CredentialPair> {
        let response = self
            .transport
            .execute(ApiRequest::post(
                "auth/refresh",
                json!({ "refresh_token": refresh_token }),
            ))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Token refresh rejected"));
        }
        response.json()
    }

    /// Invalidate a refresh token server-side.
    pub async fn logout(&self, refresh_token: &str) -> ApiResult<()> {
        let response = self
            .transport
            .execute(ApiRequest::post(
                "auth/logout",
                json!({ "refresh_token": refresh_token }),
            ))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Logout rejected"));
        }
        Ok(())
    }

    /// Log in with a provider-issued access token.
    pub async fn oauth_login(&self, provider: &str, access_token: &str) -> ApiResult<CredentialPair> {
        let response = self
            .transport
            .execute(ApiRequest::post(
                "auth/oauth/login",
                json!({ "provider": provider, "access_token": access_token }),
            ))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("OAuth login failed"));
        }
        response.json()
    }

    /// Complete the PKCE flow: trade the authorization code for a
    /// provider access token.
    pub async fn exchange_code(
        &self,
        provider: &str,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> ApiResult<String> {
        let response = self
            .transport
            .execute(ApiRequest::post(
                "auth/oauth/exchange-code",
                json!({
                    "provider": provider,
                    "code": code,
                    "redirect_uri": redirect_uri,
                    "code_verifier": code_verifier,
                }),
            ))
            .await?;
        if !response.is_success() {
            return Err(response.status_error("Code exchange failed"));
        }

        #[derive(Deserialize)]
        struct Exchanged {
            access_token: String,
        }
        let exchanged: Exchanged = response.json()?;
        Ok(exchanged.access_token)
    }

    /// Fetch the public client configuration.
    pub async fn fetch_config(&self) -> ApiResult<RemoteConfig> {
        let response = self.transport.execute(ApiRequest::get("config")).await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to fetch configuration"));
        }
        response.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{ok, status, MockTransport};

    #[tokio::test]
    async fn test_validate_sends_token_in_body_without_bearer() {
        let transport = Arc::new(MockTransport::new(vec![ok(
            json!({"valid": true, "phone": "+71234567890", "friend": true}),
        )]));
        let api = AuthApi::new(transport.clone());

        let result = api.validate("A1").await.unwrap();
        assert!(result.valid);
        assert_eq!(result.phone.as_deref(), Some("+71234567890"));
        assert!(result.friend);

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].path, "auth/validate");
        assert!(calls[0].bearer.is_none());
        assert_eq!(calls[0].body.as_ref().unwrap()["access_token"], "A1");
    }

    #[tokio::test]
    async fn test_validate_treats_rejection_as_invalid() {
        let transport = Arc::new(MockTransport::new(vec![status(401)]));
        let api = AuthApi::new(transport);

        let result = api.validate("stale").await.unwrap();
        assert!(!result.valid);
        assert!(result.phone.is_none());
    }

    #[tokio::test]
    async fn test_verify_code_returns_pair() {
        let transport = Arc::new(MockTransport::new(vec![ok(
            json!({"access_token": "X", "refresh_token": "Y"}),
        )]));
        let api = AuthApi::new(transport);

        let pair = api.verify_code("+79991234567", "1234").await.unwrap();
        assert_eq!(pair.access_token, "X");
        assert_eq!(pair.refresh_token, "Y");
    }

    #[tokio::test]
    async fn test_verify_code_surfaces_detail() {
        let transport = Arc::new(MockTransport::new(vec![crate::transport::ApiResponse {
            status: 400,
            body: json!({"detail": "Code expired"}),
        }]));
        let api = AuthApi::new(transport);

        let err = api.verify_code("+79991234567", "0000").await.unwrap_err();
        assert!(err.to_string().contains("Code expired"));
    }

    #[tokio::test]
    async fn test_refresh_rejection_is_error() {
        let transport = Arc::new(MockTransport::new(vec![status(401)]));
        let api = AuthApi::new(transport);
        assert!(api.refresh("R1").await.is_err());
    }

    #[tokio::test]
    async fn test_exchange_code_body_shape() {
        let transport = Arc::new(MockTransport::new(vec![ok(json!({"access_token": "prov"}))]));
        let api = AuthApi::new(transport.clone());

        let token = api
            .exchange_code("yandex", "code123", "http://localhost:8237/callback", "ver")
            .await
            .unwrap();
        assert_eq!(token, "prov");

        let calls = transport.calls.lock().unwrap();
        let body = calls[0].body.as_ref().unwrap();
        assert_eq!(body["provider"], "yandex");
        assert_eq!(body["code"], "code123");
        assert_eq!(body["redirect_uri"], "http://localhost:8237/callback");
        assert_eq!(body["code_verifier"], "ver");
    }
}

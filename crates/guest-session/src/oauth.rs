//! OAuth login flows.
//!
//! Providers come in two shapes, abstracted behind [`ProviderFlow`] so the
//! session core never depends on a provider SDK:
//!
//! - **Direct token**: the provider hands over an access token up front
//!   (VK ID); [`SessionManager::login_with_provider_token`] sends it
//!   straight to the backend.
//! - **Authorization code + PKCE** (Yandex): [`begin_authorization`]
//!   produces the authorize URL and stashes the verifier/state handshake;
//!   [`complete_authorization`] consumes the redirect.
//!
//! [`begin_authorization`]: SessionManager::begin_authorization
//! [`complete_authorization`]: SessionManager::complete_authorization

use crate::error::{SessionError, SessionResult};
use crate::session::SessionManager;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use guest_api::ApiError;
use guest_storage::OAuthHandshake;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, warn};
use url::{form_urlencoded, Url};

/// OAuth providers the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Vk,
    Yandex,
}

/// How a provider yields its access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderFlow {
    /// The provider hands over an access token directly.
    DirectToken,
    /// Browser redirect through the provider's authorize page, PKCE S256.
    AuthorizationCode { authorize_endpoint: String },
}

impl Provider {
    /// Name the backend knows the provider by.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Provider::Vk => "vk",
            Provider::Yandex => "yandex",
        }
    }

    pub fn flow(&self) -> ProviderFlow {
        match self {
            Provider::Vk => ProviderFlow::DirectToken,
            Provider::Yandex => ProviderFlow::AuthorizationCode {
                authorize_endpoint: "https://oauth.yandex.ru/authorize".to_string(),
            },
        }
    }
}

impl FromStr for Provider {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vk" => Ok(Provider::Vk),
            "yandex" => Ok(Provider::Yandex),
            other => Err(SessionError::OAuth(format!("Unknown provider: {other}"))),
        }
    }
}

/// Everything the caller needs to send the guest to the provider.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Full authorize URL including the PKCE challenge
    pub url: String,
    /// State nonce embedded in the URL, echoed back in the redirect
    pub state: String,
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// S256 code challenge for a PKCE verifier.
fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Translate a backend OAuth error code into a user-facing message.
/// Unknown codes pass through unchanged.
fn describe_oauth_error(code: &str) -> String {
    match code {
        "guest_not_found" => "This account is not on the guest list".to_string(),
        "no_phone" => "The provider account has no phone number attached".to_string(),
        "no_token" => "The provider did not return a token".to_string(),
        "server_error" => "Server error during sign-in, please try again".to_string(),
        "yandex_denied" => "Access was denied in Yandex".to_string(),
        "yandex_api" => "Yandex could not complete the sign-in".to_string(),
        other => other.to_string(),
    }
}

fn map_oauth_api_error(e: ApiError) -> SessionError {
    match e {
        ApiError::Status { message, .. } => SessionError::OAuth(describe_oauth_error(&message)),
        other => other.into(),
    }
}

impl SessionManager {
    /// Start an authorization-code flow.
    ///
    /// Generates the PKCE verifier and state nonce, stores them as the
    /// one-shot handshake, and returns the authorize URL carrying the S256
    /// challenge. The verifier itself never leaves the process.
    pub fn begin_authorization(
        &self,
        provider: Provider,
        client_id: &str,
        redirect_uri: &str,
    ) -> SessionResult<AuthorizationRequest> {
        let ProviderFlow::AuthorizationCode { authorize_endpoint } = provider.flow() else {
            return Err(SessionError::OAuth(format!(
                "{} does not use the authorization-code flow",
                provider.wire_name()
            )));
        };

        let code_verifier = random_string(64);
        let state = random_string(32);
        self.handshake.store(&OAuthHandshake {
            state: state.clone(),
            code_verifier: code_verifier.clone(),
        })?;

        let mut url = Url::parse(&authorize_endpoint)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", &state)
            .append_pair("code_challenge", &code_challenge(&code_verifier))
            .append_pair("code_challenge_method", "S256");

        info!(provider = provider.wire_name(), "Authorization flow started");
        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }

    /// Finish an authorization-code flow with the query string the
    /// provider redirected back with.
    ///
    /// The stored handshake is consumed no matter how this call ends, so a
    /// replayed redirect cannot be exchanged twice. A state mismatch aborts
    /// before any backend call.
    pub async fn complete_authorization(
        &self,
        provider: Provider,
        redirect_query: &str,
        redirect_uri: &str,
    ) -> SessionResult<()> {
        let params: HashMap<String, String> = form_urlencoded::parse(redirect_query.as_bytes())
            .into_owned()
            .collect();

        // Single use: take the handshake before looking at anything else.
        let handshake = self.handshake.take()?;

        if let Some(error) = params.get("error") {
            warn!(provider = provider.wire_name(), error = %error, "Provider returned an error");
            return Err(SessionError::OAuth(describe_oauth_error(error)));
        }

        let code = params
            .get("code")
            .ok_or_else(|| SessionError::OAuth("Redirect carried no code".to_string()))?;
        let state = params
            .get("state")
            .ok_or_else(|| SessionError::OAuth("Redirect carried no state".to_string()))?;
        let handshake = handshake
            .ok_or_else(|| SessionError::OAuth("No authorization in progress".to_string()))?;

        if *state != handshake.state {
            warn!(provider = provider.wire_name(), "State nonce mismatch, aborting exchange");
            return Err(SessionError::StateMismatch);
        }

        let provider_token = self
            .auth
            .exchange_code(
                provider.wire_name(),
                code,
                redirect_uri,
                &handshake.code_verifier,
            )
            .await
            .map_err(map_oauth_api_error)?;

        self.login_with_provider_token(provider, &provider_token)
            .await
    }

    /// Log in with an access token the provider issued directly.
    pub async fn login_with_provider_token(
        &self,
        provider: Provider,
        provider_token: &str,
    ) -> SessionResult<()> {
        let pair = self
            .auth
            .oauth_login(provider.wire_name(), provider_token)
            .await
            .map_err(map_oauth_api_error)?;

        self.login(&pair.access_token, &pair.refresh_token).await?;
        info!(provider = provider.wire_name(), "OAuth login complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ok, MockTransport};
    use guest_api::AuthApi;
    use guest_storage::{HandshakeStore, MemoryStorage, TokenStore};
    use serde_json::json;
    use std::sync::Arc;

    const REDIRECT_URI: &str = "http://localhost:8237/callback";

    fn manager_with(transport: Arc<MockTransport>) -> (SessionManager, TokenStore) {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let handshake = HandshakeStore::new(Arc::new(MemoryStorage::new()));
        let auth = AuthApi::new(transport);
        (
            SessionManager::new(tokens.clone(), handshake, auth),
            tokens,
        )
    }

    #[test]
    fn test_code_challenge_rfc7636_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_random_strings_differ() {
        assert_ne!(random_string(64), random_string(64));
        assert_eq!(random_string(32).len(), 32);
    }

    #[test]
    fn test_begin_authorization_builds_url_without_verifier() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let (manager, _) = manager_with(transport);

        let request = manager
            .begin_authorization(Provider::Yandex, "client-1", REDIRECT_URI)
            .unwrap();

        let url = Url::parse(&request.url).unwrap();
        assert_eq!(url.host_str(), Some("oauth.yandex.ru"));

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-1");
        assert_eq!(params["redirect_uri"], REDIRECT_URI);
        assert_eq!(params["state"], request.state);
        assert_eq!(params["code_challenge_method"], "S256");
        // Challenge present, verifier absent
        assert_eq!(params["code_challenge"].len(), 43);
        assert!(!request.url.contains("code_verifier"));
    }

    #[test]
    fn test_begin_authorization_rejects_direct_token_provider() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let (manager, _) = manager_with(transport);

        assert!(manager
            .begin_authorization(Provider::Vk, "client-1", REDIRECT_URI)
            .is_err());
    }

    #[tokio::test]
    async fn test_state_mismatch_aborts_without_exchange() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let (manager, _) = manager_with(transport.clone());

        manager
            .begin_authorization(Provider::Yandex, "client-1", REDIRECT_URI)
            .unwrap();

        let err = manager
            .complete_authorization(Provider::Yandex, "code=abc&state=forged", REDIRECT_URI)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::StateMismatch));
        assert_eq!(transport.call_count(), 0);

        // The handshake was consumed: replaying with the right state now
        // finds nothing to match against.
        let err = manager
            .complete_authorization(Provider::Yandex, "code=abc&state=whatever", REDIRECT_URI)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::OAuth(_)));
    }

    #[tokio::test]
    async fn test_provider_error_is_mapped() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let (manager, _) = manager_with(transport.clone());

        manager
            .begin_authorization(Provider::Yandex, "client-1", REDIRECT_URI)
            .unwrap();

        let err = manager
            .complete_authorization(Provider::Yandex, "error=yandex_denied", REDIRECT_URI)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Access was denied in Yandex");
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_authorization_exchanges_and_logs_in() {
        let transport = Arc::new(MockTransport::new(vec![
            ok(json!({"access_token": "provider-token"})),
            ok(json!({"access_token": "A1", "refresh_token": "R1"})),
            ok(json!({"valid": true, "phone": "+71234567890", "friend": true})),
        ]));
        let (manager, tokens) = manager_with(transport.clone());

        let request = manager
            .begin_authorization(Provider::Yandex, "client-1", REDIRECT_URI)
            .unwrap();

        let query = format!("code=authcode&state={}", request.state);
        manager
            .complete_authorization(Provider::Yandex, &query, REDIRECT_URI)
            .await
            .unwrap();

        assert!(manager.is_authenticated());
        assert_eq!(tokens.credentials().unwrap().unwrap().access_token, "A1");

        let calls = transport.calls();
        assert_eq!(calls[0].path, "auth/oauth/exchange-code");
        let body = calls[0].body.as_ref().unwrap();
        assert_eq!(body["provider"], "yandex");
        assert_eq!(body["code"], "authcode");
        assert_eq!(body["redirect_uri"], REDIRECT_URI);
        assert_eq!(body["code_verifier"].as_str().unwrap().len(), 64);
        assert_eq!(calls[1].path, "auth/oauth/login");
        assert_eq!(calls[1].body.as_ref().unwrap()["access_token"], "provider-token");
    }

    #[tokio::test]
    async fn test_direct_token_login() {
        let transport = Arc::new(MockTransport::new(vec![
            ok(json!({"access_token": "A1", "refresh_token": "R1"})),
            ok(json!({"valid": true, "phone": null, "friend": false})),
        ]));
        let (manager, _) = manager_with(transport.clone());

        manager
            .login_with_provider_token(Provider::Vk, "vk-token")
            .await
            .unwrap();

        assert!(manager.is_authenticated());
        let calls = transport.calls();
        assert_eq!(calls[0].path, "auth/oauth/login");
        assert_eq!(calls[0].body.as_ref().unwrap()["provider"], "vk");
    }

    #[tokio::test]
    async fn test_backend_error_code_is_described() {
        let transport = Arc::new(MockTransport::new(vec![Ok(guest_api::ApiResponse {
            status: 403,
            body: json!({"detail": "guest_not_found"}),
        })]));
        let (manager, _) = manager_with(transport);

        let err = manager
            .login_with_provider_token(Provider::Vk, "vk-token")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This account is not on the guest list");
    }
}

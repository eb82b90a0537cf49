//! Session management with FSM-based state tracking and single-flight
//! token refresh.

use crate::error::{SessionError, SessionResult};
use crate::fsm::{SessionMachine, SessionMachineInput, SessionState};
use guest_api::{AuthApi, RefreshHandler};
use guest_storage::{CredentialPair, HandshakeStore, TokenStore};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// The guest identity attached to an authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestUser {
    /// Normalized phone number, when the backend knows it
    pub phone: Option<String>,
    /// Whether the guest is on the friend list (unlocks extra content)
    pub friend: bool,
}

/// Snapshot of the session as seen by callers.
///
/// `is_authenticated` implies `user` is present; `is_loading` is true only
/// during the startup validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub user: Option<GuestUser>,
}

impl Session {
    fn authenticated(user: GuestUser) -> Self {
        Self {
            is_authenticated: true,
            is_loading: false,
            user: Some(user),
        }
    }

    fn anonymous() -> Self {
        Self::default()
    }

    fn loading() -> Self {
        Self {
            is_authenticated: false,
            is_loading: true,
            user: None,
        }
    }
}

/// Callback type for session change notifications.
pub type SessionCallback = Box<dyn Fn(Session) + Send + Sync>;

/// Owns the session lifecycle: startup validation, login, logout, and the
/// single refresh procedure everyone else delegates to.
///
/// The FSM tracks transient states (validating, refreshing, logging out)
/// that are never persisted; the credential pair itself lives in the token
/// store. Concurrent refresh callers are collapsed into one network call:
/// a caller that waited while another refresh completed adopts its outcome.
pub struct SessionManager {
    pub(crate) tokens: TokenStore,
    pub(crate) handshake: HandshakeStore,
    pub(crate) auth: AuthApi,
    fsm: Mutex<SessionMachine>,
    snapshot: Mutex<Session>,
    session_callback: Mutex<Option<SessionCallback>>,
    refresh_gate: tokio::sync::Mutex<()>,
    refresh_epoch: AtomicU64,
    last_refresh_ok: AtomicBool,
}

impl SessionManager {
    pub fn new(tokens: TokenStore, handshake: HandshakeStore, auth: AuthApi) -> Self {
        Self {
            tokens,
            handshake,
            auth,
            fsm: Mutex::new(SessionMachine::new()),
            snapshot: Mutex::new(Session::default()),
            session_callback: Mutex::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
            refresh_epoch: AtomicU64::new(0),
            last_refresh_ok: AtomicBool::new(false),
        }
    }

    /// Set a callback to be notified whenever the session snapshot changes.
    pub fn set_session_callback(&self, callback: SessionCallback) {
        let mut cb = self.session_callback.lock().unwrap();
        *cb = Some(callback);
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.snapshot.lock().unwrap().clone()
    }

    /// Current FSM state.
    pub fn state(&self) -> SessionState {
        let fsm = self.fsm.lock().unwrap();
        SessionState::from(fsm.state())
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.lock().unwrap().is_authenticated
    }

    /// Transition the FSM, logging the change.
    pub(crate) fn transition(&self, input: &SessionMachineInput) -> SessionResult<SessionState> {
        let mut fsm = self.fsm.lock().unwrap();
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(?old_state, ?new_state, "Session state transition");
        }

        Ok(new_state)
    }

    /// Replace the snapshot and notify the callback if it changed.
    fn set_session(&self, session: Session) {
        let changed = {
            let mut snapshot = self.snapshot.lock().unwrap();
            if *snapshot == session {
                false
            } else {
                *snapshot = session.clone();
                true
            }
        };

        if changed {
            let cb = self.session_callback.lock().unwrap();
            if let Some(callback) = cb.as_ref() {
                callback(session);
            }
        }
    }

    /// Validate the stored session on startup.
    ///
    /// Walks the FSM through the startup path:
    /// - Validating -> NoCredentials -> NotLoggedIn (nothing stored)
    /// - Validating -> CredentialsFound -> VerifyingWithServer ->
    ///   ServerVerified -> LoggedIn
    /// - ... -> ServerRejected -> Refreshing -> (RefreshSuccess | RefreshFailed)
    /// - ... -> NetworkFailed -> NotLoggedIn (tokens cleared, fail closed)
    ///
    /// Returns whether an authenticated session is in place afterwards.
    pub async fn validate_on_startup(&self) -> SessionResult<bool> {
        self.transition(&SessionMachineInput::ValidateSession)?;
        self.set_session(Session::loading());

        let pair = match self.tokens.credentials()? {
            Some(pair) => pair,
            None => {
                // A dangling half of a pair counts as no session at all
                self.tokens.clear_credentials()?;
                info!("No stored session found on startup");
                self.transition(&SessionMachineInput::NoCredentials)?;
                self.set_session(Session::anonymous());
                return Ok(false);
            }
        };

        self.transition(&SessionMachineInput::CredentialsFound)?;

        match self.auth.validate(&pair.access_token).await {
            Ok(answer) if answer.valid => {
                self.transition(&SessionMachineInput::ServerVerified)?;
                self.set_session(Session::authenticated(GuestUser {
                    phone: answer.phone,
                    friend: answer.friend,
                }));
                info!("Stored session validated on startup");
                Ok(true)
            }
            Ok(_) => {
                info!("Stored token rejected on startup, attempting refresh");
                self.transition(&SessionMachineInput::ServerRejected)?;
                self.refresh().await
            }
            Err(e) => {
                // Fail closed: an unverifiable session is no session.
                warn!(error = %e, "Could not verify session on startup, clearing stored session");
                self.tokens.clear_credentials()?;
                self.transition(&SessionMachineInput::NetworkFailed)?;
                self.set_session(Session::anonymous());
                Ok(false)
            }
        }
    }

    /// Run the refresh procedure, collapsing concurrent callers into a
    /// single network attempt.
    ///
    /// Returns whether a fresh, server-verified credential pair is now
    /// stored. With no refresh token this answers `false` without any
    /// network traffic. On failure the credential pair is cleared.
    pub async fn refresh(&self) -> SessionResult<bool> {
        let epoch_seen = self.refresh_epoch.load(Ordering::SeqCst);
        let _gate = self.refresh_gate.lock().await;

        // Someone else finished a refresh while we waited for the gate;
        // their outcome answers our question too.
        if self.refresh_epoch.load(Ordering::SeqCst) != epoch_seen {
            let adopted = self.last_refresh_ok.load(Ordering::SeqCst);
            debug!(adopted, "Adopting outcome of a concurrent refresh");
            return Ok(adopted);
        }

        let result = self.do_refresh().await;
        let ok = matches!(&result, Ok(true));
        self.last_refresh_ok.store(ok, Ordering::SeqCst);
        self.refresh_epoch.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// One refresh attempt. Callers must hold the refresh gate.
    async fn do_refresh(&self) -> SessionResult<bool> {
        let refresh_token = match self.tokens.refresh_token()? {
            Some(token) => token,
            None => {
                debug!("No refresh token stored, nothing to refresh");
                return Ok(false);
            }
        };

        // Entering from LoggedIn (401 on a business call); during startup
        // the machine is already in Refreshing.
        let _ = self.transition(&SessionMachineInput::AccessRejected);

        let pair = match self.auth.refresh(&refresh_token).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.clear_session_after_refresh_failure()?;
                return Ok(false);
            }
        };

        self.tokens.store_credentials(&pair)?;

        // Re-validate with the new token so the session carries the guest
        // identity, exactly like the startup path.
        match self.auth.validate(&pair.access_token).await {
            Ok(answer) if answer.valid => {
                let _ = self.transition(&SessionMachineInput::RefreshSuccess);
                self.set_session(Session::authenticated(GuestUser {
                    phone: answer.phone,
                    friend: answer.friend,
                }));
                info!("Session refreshed");
                Ok(true)
            }
            Ok(_) => {
                warn!("Backend rejected the freshly issued token, clearing session");
                self.clear_session_after_refresh_failure()?;
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Could not verify refreshed token, clearing session");
                self.clear_session_after_refresh_failure()?;
                Ok(false)
            }
        }
    }

    fn clear_session_after_refresh_failure(&self) -> SessionResult<()> {
        self.tokens.clear_credentials()?;
        let _ = self.transition(&SessionMachineInput::RefreshFailed);
        self.set_session(Session::anonymous());
        Ok(())
    }

    /// Store a credential pair and verify it with the backend.
    ///
    /// Called with the pair obtained from phone verification or an OAuth
    /// flow. The follow-up validate call populates the guest identity; if
    /// the backend rejects the pair it is cleared again.
    pub async fn login(&self, access_token: &str, refresh_token: &str) -> SessionResult<()> {
        self.transition(&SessionMachineInput::LoginAttempt)?;

        self.tokens.store_credentials(&CredentialPair {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        })?;

        match self.auth.validate(access_token).await {
            Ok(answer) if answer.valid => {
                self.transition(&SessionMachineInput::LoginSuccess)?;
                self.set_session(Session::authenticated(GuestUser {
                    phone: answer.phone,
                    friend: answer.friend,
                }));
                info!("Logged in");
                Ok(())
            }
            Ok(_) => {
                self.tokens.clear_credentials()?;
                self.transition(&SessionMachineInput::LoginFailed)?;
                self.set_session(Session::anonymous());
                Err(SessionError::LoginRejected(
                    "Backend rejected the new credentials".to_string(),
                ))
            }
            Err(e) => {
                // Keep the pair: the next startup validation gets to decide.
                self.transition(&SessionMachineInput::LoginFailed)?;
                self.set_session(Session::anonymous());
                Err(e.into())
            }
        }
    }

    /// Log out: best-effort server-side invalidation, then clear all local
    /// session state. The server call failing never blocks the local
    /// logout.
    pub async fn logout(&self) -> SessionResult<()> {
        let _ = self.transition(&SessionMachineInput::LogoutRequested);

        if let Some(refresh_token) = self.tokens.refresh_token()? {
            if let Err(e) = self.auth.logout(&refresh_token).await {
                warn!(error = %e, "Server-side logout failed, clearing local session anyway");
            }
        }

        self.tokens.clear_credentials()?;
        self.tokens.clear_verification()?;

        let _ = self.transition(&SessionMachineInput::LogoutComplete);
        self.set_session(Session::anonymous());

        info!("Logged out");
        Ok(())
    }

    /// Adapter handed to the API client so a 401 on a business endpoint
    /// funnels into the same single-flight refresh.
    pub fn refresh_handler(self: &Arc<Self>) -> RefreshHandler {
        let manager = Arc::clone(self);
        Arc::new(move || {
            let manager = Arc::clone(&manager);
            Box::pin(async move { manager.refresh().await.unwrap_or(false) })
        })
    }
}

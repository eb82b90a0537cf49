//! Session lifecycle for the wedding guest client.
//!
//! An explicit FSM ([`SessionState`]) tracks the lifecycle, a
//! [`SessionManager`] drives it: startup validation, phone-verification
//! login, OAuth flows, single-flight token refresh, and logout.

mod callback;
mod error;
mod fsm;
mod oauth;
mod session;
mod verify;

#[cfg(test)]
pub(crate) mod test_support;

pub use callback::{CallbackServer, DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT_SECS};
pub use error::{SessionError, SessionResult};
pub use fsm::SessionState;
pub use oauth::{AuthorizationRequest, Provider, ProviderFlow};
pub use session::{GuestUser, Session, SessionCallback, SessionManager};
pub use verify::normalize_phone;

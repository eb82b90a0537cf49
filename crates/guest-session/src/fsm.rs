//! Session lifecycle state machine using rust-fsm.
//!
//! The machine makes the session lifecycle explicit instead of deriving it
//! from which tokens happen to be in storage.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │   NotLoggedIn   │ (initial)
//! └────────┬────────┘
//!          │ ValidateSession / LoginAttempt
//!          ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │   Validating    │     │    LoggingIn    │
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//!          │ CredentialsFound      │ LoginSuccess / LoginFailed
//!          ▼                       ▼
//! ┌───────────────────┐     LoggedIn / NotLoggedIn
//! │VerifyingWithServer│
//! └────────┬──────────┘
//!          │ ServerVerified ──► LoggedIn ──LogoutRequested──► LoggingOut
//!          │ ServerRejected ──► Refreshing
//!          │ NetworkFailed  ──► NotLoggedIn
//!          │
//!          ▼ (Refreshing: RefreshSuccess ──► LoggedIn,
//!             RefreshFailed ──► NotLoggedIn)
//! ```
//!
//! `Refreshing` has no self-loop: the refresh procedure is a single attempt,
//! it either produces a new credential pair or clears the session.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(NotLoggedIn)

    NotLoggedIn => {
        ValidateSession => Validating,
        LoginAttempt => LoggingIn
    },
    Validating => {
        // Both halves of the credential pair are present
        CredentialsFound => VerifyingWithServer,
        // No (or a dangling half of a) stored pair
        NoCredentials => NotLoggedIn
    },
    VerifyingWithServer => {
        ServerVerified => LoggedIn,
        // Token rejected - try the refresh token before giving up
        ServerRejected => Refreshing,
        // Could not reach the server; fail closed, stay logged out
        NetworkFailed => NotLoggedIn
    },
    LoggingIn => {
        LoginSuccess => LoggedIn,
        LoginFailed => NotLoggedIn
    },
    LoggedIn => {
        // A business request came back 401
        AccessRejected => Refreshing,
        LogoutRequested => LoggingOut
    },
    Refreshing => {
        RefreshSuccess => LoggedIn,
        RefreshFailed => NotLoggedIn
    },
    LoggingOut => {
        LogoutComplete => NotLoggedIn
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Simplified view of the machine state for callers and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session.
    NotLoggedIn,
    /// Checking which credentials are stored.
    Validating,
    /// Asking the backend whether the stored token is still accepted.
    VerifyingWithServer,
    /// Currently logging in.
    LoggingIn,
    /// Logged in with a server-verified session.
    LoggedIn,
    /// Exchanging the refresh token for a new pair.
    Refreshing,
    /// Currently logging out.
    LoggingOut,
}

impl SessionState {
    /// Returns true only for a server-verified session.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::LoggedIn)
    }

    /// Returns true while an operation is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::Validating
                | SessionState::VerifyingWithServer
                | SessionState::LoggingIn
                | SessionState::Refreshing
                | SessionState::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::NotLoggedIn => SessionState::NotLoggedIn,
            SessionMachineState::Validating => SessionState::Validating,
            SessionMachineState::VerifyingWithServer => SessionState::VerifyingWithServer,
            SessionMachineState::LoggingIn => SessionState::LoggingIn,
            SessionMachineState::LoggedIn => SessionState::LoggedIn,
            SessionMachineState::Refreshing => SessionState::Refreshing,
            SessionMachineState::LoggingOut => SessionState::LoggingOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_not_logged_in() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_startup_validation_happy_path() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::ValidateSession)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Validating);

        machine
            .consume(&SessionMachineInput::CredentialsFound)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::VerifyingWithServer);

        machine
            .consume(&SessionMachineInput::ServerVerified)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggedIn);
    }

    #[test]
    fn test_startup_without_credentials() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::ValidateSession)
            .unwrap();
        machine
            .consume(&SessionMachineInput::NoCredentials)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_rejected_token_goes_through_refresh() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::ValidateSession)
            .unwrap();
        machine
            .consume(&SessionMachineInput::CredentialsFound)
            .unwrap();
        machine
            .consume(&SessionMachineInput::ServerRejected)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Refreshing);

        machine
            .consume(&SessionMachineInput::RefreshSuccess)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggedIn);
    }

    #[test]
    fn test_network_failure_leaves_session_logged_out() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::ValidateSession)
            .unwrap();
        machine
            .consume(&SessionMachineInput::CredentialsFound)
            .unwrap();
        machine.consume(&SessionMachineInput::NetworkFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_login_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingIn);

        machine.consume(&SessionMachineInput::LoginSuccess).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggedIn);
    }

    #[test]
    fn test_login_failure_returns_to_not_logged_in() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine.consume(&SessionMachineInput::LoginFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_access_rejection_triggers_refresh() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine.consume(&SessionMachineInput::LoginSuccess).unwrap();
        machine
            .consume(&SessionMachineInput::AccessRejected)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Refreshing);

        machine.consume(&SessionMachineInput::RefreshFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_logout_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine.consume(&SessionMachineInput::LoginSuccess).unwrap();
        machine
            .consume(&SessionMachineInput::LogoutRequested)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingOut);

        machine
            .consume(&SessionMachineInput::LogoutComplete)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::NotLoggedIn);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let mut machine = SessionMachine::new();

        // Cannot claim a refresh outcome without being in Refreshing
        assert!(machine
            .consume(&SessionMachineInput::RefreshSuccess)
            .is_err());

        // Cannot logout without a session
        assert!(machine
            .consume(&SessionMachineInput::LogoutRequested)
            .is_err());

        // Cannot skip server verification
        machine
            .consume(&SessionMachineInput::ValidateSession)
            .unwrap();
        assert!(machine
            .consume(&SessionMachineInput::ServerVerified)
            .is_err());
    }

    #[test]
    fn test_no_retry_loop_inside_refreshing() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine.consume(&SessionMachineInput::LoginSuccess).unwrap();
        machine
            .consume(&SessionMachineInput::AccessRejected)
            .unwrap();

        // A second rejection while already refreshing is not a valid input
        assert!(machine
            .consume(&SessionMachineInput::AccessRejected)
            .is_err());
    }

    #[test]
    fn test_session_state_predicates() {
        assert!(SessionState::LoggedIn.is_authenticated());
        assert!(!SessionState::Refreshing.is_authenticated());
        assert!(!SessionState::NotLoggedIn.is_transient());
        assert!(!SessionState::LoggedIn.is_transient());
        assert!(SessionState::Validating.is_transient());
        assert!(SessionState::VerifyingWithServer.is_transient());
        assert!(SessionState::LoggingOut.is_transient());
    }

    #[test]
    fn test_session_state_conversion() {
        assert_eq!(
            SessionState::from(&SessionMachineState::VerifyingWithServer),
            SessionState::VerifyingWithServer
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Refreshing),
            SessionState::Refreshing
        );
    }
}

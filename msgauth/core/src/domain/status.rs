// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Outcome Status and Exchange State
//!
//! [`AuthStatus`] is the closed set of values a module (and a whole module chain) can
//! return from a secure or validate pass. [`ExchangeState`] tracks where one message
//! exchange stands after a pass.
//!
//! ```text
//! Init ──secure/validate pass──► Secured               (Success, SendSuccess)
//!                              ├► AwaitingContinuation (SendContinue: another round trip,
//!                              │                        same MessageInfo and scratch map)
//!                              └► Failed               (Failure, SendFailure, AuthError)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one module invocation or one chain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Processing succeeded; the message may be dispatched (or handed to the application).
    Success,
    /// Processing succeeded and the module produced a message that must be sent.
    SendSuccess,
    /// Processing is incomplete; the staged message must be sent and the exchange continued.
    SendContinue,
    /// Processing failed and no message should be sent.
    Failure,
    /// Processing failed and the staged failure response must be sent.
    SendFailure,
}

impl AuthStatus {
    /// Whether a chain pass moves on to the next module after this status.
    pub fn continues_chain(self) -> bool {
        matches!(self, Self::Success | Self::SendSuccess)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failure | Self::SendFailure)
    }

    /// Whether the runtime has a staged message to send.
    pub fn requires_send(self) -> bool {
        matches!(self, Self::SendSuccess | Self::SendContinue | Self::SendFailure)
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::SendSuccess => "SEND_SUCCESS",
            Self::SendContinue => "SEND_CONTINUE",
            Self::Failure => "FAILURE",
            Self::SendFailure => "SEND_FAILURE",
        };
        f.write_str(name)
    }
}

/// Position of one message exchange in its round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Init,
    Secured,
    AwaitingContinuation,
    Failed,
}

impl ExchangeState {
    /// State reached after a pass returned `status`.
    pub fn after(status: AuthStatus) -> Self {
        match status {
            AuthStatus::Success | AuthStatus::SendSuccess => Self::Secured,
            AuthStatus::SendContinue => Self::AwaitingContinuation,
            AuthStatus::Failure | AuthStatus::SendFailure => Self::Failed,
        }
    }

    /// State reached after a pass returned either a status or an error.
    pub fn after_result<E>(result: &Result<AuthStatus, E>) -> Self {
        match result {
            Ok(status) => Self::after(*status),
            Err(_) => Self::Failed,
        }
    }

    /// `Secured` and `Failed` end the current round trip.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Secured | Self::Failed)
    }

    /// Whether another pass may run on this exchange.
    pub fn accepts_pass(self) -> bool {
        matches!(self, Self::Init | Self::AwaitingContinuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_continuation_rule() {
        assert!(AuthStatus::Success.continues_chain());
        assert!(AuthStatus::SendSuccess.continues_chain());
        assert!(!AuthStatus::SendContinue.continues_chain());
        assert!(!AuthStatus::Failure.continues_chain());
        assert!(!AuthStatus::SendFailure.continues_chain());
    }

    #[test]
    fn test_exchange_transitions() {
        assert_eq!(ExchangeState::after(AuthStatus::Success), ExchangeState::Secured);
        assert_eq!(ExchangeState::after(AuthStatus::SendSuccess), ExchangeState::Secured);
        assert_eq!(
            ExchangeState::after(AuthStatus::SendContinue),
            ExchangeState::AwaitingContinuation
        );
        assert_eq!(ExchangeState::after(AuthStatus::SendFailure), ExchangeState::Failed);

        let err: Result<AuthStatus, ()> = Err(());
        assert_eq!(ExchangeState::after_result(&err), ExchangeState::Failed);
        assert!(ExchangeState::AwaitingContinuation.accepts_pass());
        assert!(ExchangeState::Failed.is_terminal());
        assert!(!ExchangeState::Secured.accepts_pass());
    }

    #[test]
    fn test_display_and_serde_names() {
        assert_eq!(AuthStatus::SendContinue.to_string(), "SEND_CONTINUE");
        let json = serde_json::to_string(&AuthStatus::SendFailure).unwrap();
        assert_eq!(json, "\"send_failure\"");
    }
}

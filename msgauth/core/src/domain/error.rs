// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Error Taxonomy
//!
//! | Error | Raised by | Recovery |
//! |-------|-----------|----------|
//! | [`PolicyError`] | `MessagePolicy` / `TargetPolicy` construction | fatal configuration fault |
//! | [`AuthError`] | modules, configs, contexts, providers | caller sends or synthesizes a failure response |
//! | [`RegistryError`] | registry mutation with a declared provider | caller decides |
//! | [`StoreError`] | declarative registration stores | caller decides |
//!
//! Registry queries for unknown ids are not errors: they answer `false` / `None`.

use thiserror::Error;

/// Malformed message policy shape (the "configuration error" of the framework).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Target list must not be empty (omit it to address the whole message)")]
    EmptyTargets,

    #[error("Target policy list must not be empty (omit the message policy instead)")]
    EmptyTargetPolicies,
}

/// The single checked failure kind of message authentication processing.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Authentication did not succeed. `response_staged` tells the caller whether a module
    /// already placed a failure response in the exchange; if not, the caller must
    /// synthesize a generic one.
    #[error("Authentication failed: {reason}")]
    Failed { reason: String, response_staged: bool },

    #[error("Module '{module}' failed: {reason}")]
    Module { module: String, reason: String },

    #[error("Module '{module}' could not be initialized: {reason}")]
    Initialization { module: String, reason: String },

    #[error("Credential handler failed: {0}")]
    Callback(String),

    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(String),

    #[error("Invalid message policy: {0}")]
    Policy(#[from] PolicyError),
}

impl AuthError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            response_staged: false,
        }
    }

    /// A failure for which the raising module already staged a response message.
    pub fn failed_with_response(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            response_staged: true,
        }
    }

    pub fn module(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            reason: reason.into(),
        }
    }

    pub fn response_staged(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                response_staged: true,
                ..
            }
        )
    }
}

/// Errors from registry mutations that have to construct a provider or touch the
/// declarative store.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown provider class: {0}")]
    UnknownProviderClass(String),

    #[error("Provider class '{class_name}' could not be constructed: {source}")]
    ProviderConstruction {
        class_name: String,
        #[source]
        source: AuthError,
    },

    #[error("Registration store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from reading or writing declarative registrations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid registration manifest: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_staged_flag() {
        assert!(AuthError::failed_with_response("bad password").response_staged());
        assert!(!AuthError::failed("bad password").response_staged());
        assert!(!AuthError::module("basic", "boom").response_staged());
    }

    #[test]
    fn test_policy_error_converts_into_auth_error() {
        let err: AuthError = PolicyError::EmptyTargets.into();
        assert!(matches!(err, AuthError::Policy(PolicyError::EmptyTargets)));
    }
}

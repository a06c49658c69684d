// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// In-Memory Credential Handler
//
// Reference CallbackHandler backed by in-process tables:
//   users        name -> SHA-256 password digest
//   secret keys  alias -> key bytes
//   private keys alias -> key bytes + certificate chain
//   trust store / cert store certificate lists
//
// Password digests are compared in constant time.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::callback::{
    Callback, CallbackHandler, Certificate, PasswordValidationCallback, PrivateKey,
    PrivateKeyCallback, PrivateKeyRequest, SecretKey, SecretKeyCallback, SecretKeyRequest,
};
use crate::domain::error::AuthError;
use crate::domain::identity::Principal;

/// Hex-encoded SHA-256 digest of `password`, the form user tables are declared in.
pub fn password_digest_hex(password: &[u8]) -> String {
    hex::encode(Sha256::digest(password))
}

#[derive(Default)]
pub struct InMemoryCredentialHandler {
    users: HashMap<String, [u8; 32]>,
    secret_keys: HashMap<String, SecretKey>,
    private_keys: HashMap<String, (PrivateKey, Vec<Certificate>)>,
    trust_store: Vec<Certificate>,
    cert_store: Vec<Certificate>,
}

impl InMemoryCredentialHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user by clear-text password (hashed immediately).
    pub fn with_user(mut self, name: impl Into<String>, password: &str) -> Self {
        let password = Zeroizing::new(password.as_bytes().to_vec());
        let digest: [u8; 32] = Sha256::digest(password.as_slice()).into();
        self.users.insert(name.into(), digest);
        self
    }

    /// Add a user by hex SHA-256 digest.
    pub fn with_user_digest(mut self, name: impl Into<String>, digest_hex: &str) -> Result<Self, AuthError> {
        let name = name.into();
        let bytes = hex::decode(digest_hex.trim())
            .map_err(|e| AuthError::Callback(format!("invalid digest for user '{}': {}", name, e)))?;
        let digest: [u8; 32] = bytes.try_into().map_err(|_| {
            AuthError::Callback(format!("digest for user '{}' is not 32 bytes", name))
        })?;
        self.users.insert(name, digest);
        Ok(self)
    }

    pub fn with_secret_key(mut self, alias: impl Into<String>, key: Vec<u8>) -> Self {
        self.secret_keys.insert(alias.into(), SecretKey::new(key));
        self
    }

    pub fn with_private_key(
        mut self,
        alias: impl Into<String>,
        key: Vec<u8>,
        chain: Vec<Certificate>,
    ) -> Self {
        self.private_keys
            .insert(alias.into(), (PrivateKey::new(key), chain));
        self
    }

    pub fn with_trust_store(mut self, certificates: Vec<Certificate>) -> Self {
        self.trust_store = certificates;
        self
    }

    pub fn with_cert_store(mut self, certificates: Vec<Certificate>) -> Self {
        self.cert_store = certificates;
        self
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn validate_password(&self, callback: &mut PasswordValidationCallback) {
        let valid = match (self.users.get(callback.username()), callback.password()) {
            (Some(expected), Some(password)) => {
                let digest: [u8; 32] = Sha256::digest(password).into();
                bool::from(digest[..].ct_eq(&expected[..]))
            }
            _ => false,
        };
        debug!(
            "Password validation for '{}': {}",
            callback.username(),
            if valid { "accepted" } else { "rejected" }
        );
        callback.set_result(valid);
        callback.clear_password();
    }

    fn resolve_private_key(&self, callback: &mut PrivateKeyCallback) -> Result<(), AuthError> {
        let alias = match callback.request() {
            Some(PrivateKeyRequest::Alias(alias)) => alias.clone(),
            Some(other) => {
                return Err(AuthError::Callback(format!(
                    "unsupported private key request: {:?}",
                    other
                )))
            }
            None => match self.private_keys.keys().next() {
                Some(alias) if self.private_keys.len() == 1 => alias.clone(),
                _ => return Ok(()),
            },
        };
        if let Some((key, chain)) = self.private_keys.get(&alias) {
            callback.set_key(key.clone(), chain.clone());
        }
        Ok(())
    }

    fn resolve_secret_key(&self, callback: &mut SecretKeyCallback) {
        let SecretKeyRequest::Alias(alias) = callback.request();
        if let Some(key) = self.secret_keys.get(alias).cloned() {
            callback.set_key(key);
        }
    }
}

impl CallbackHandler for InMemoryCredentialHandler {
    fn handle(&self, callbacks: &mut [Callback<'_>]) -> Result<(), AuthError> {
        for callback in callbacks.iter_mut() {
            match callback {
                Callback::CallerPrincipal(cb) => {
                    let principal = match (&cb.principal, &cb.name) {
                        (Some(p), _) => Some(p.clone()),
                        (None, Some(name)) => Some(Principal::caller(name.clone())),
                        (None, None) => None,
                    };
                    if let Some(principal) = principal {
                        debug!("Assigning caller principal '{}'", principal.name);
                        cb.subject.add_principal(principal);
                    }
                }
                Callback::GroupPrincipal(cb) => {
                    for group in &cb.groups {
                        cb.subject.add_principal(Principal::group(group.clone()));
                    }
                }
                Callback::PasswordValidation(cb) => self.validate_password(cb),
                Callback::PrivateKey(cb) => self.resolve_private_key(cb)?,
                Callback::SecretKey(cb) => self.resolve_secret_key(cb),
                Callback::TrustStore(cb) => cb.trust_store = Some(self.trust_store.clone()),
                Callback::CertStore(cb) => cb.cert_store = Some(self.cert_store.clone()),
            }
        }
        Ok(())
    }
}

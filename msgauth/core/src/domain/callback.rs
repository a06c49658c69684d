// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Credential-Resolution Callbacks
//!
//! Modules never resolve credentials, keys or certificates themselves. They fill in a
//! typed request record, hand a batch of them to the runtime's [`CallbackHandler`], and
//! read the answers back from the same records.
//!
//! | Record | Request fields | Answer fields |
//! |--------|----------------|---------------|
//! | [`CallerPrincipalCallback`] | subject, principal or name | (applied to subject) |
//! | [`GroupPrincipalCallback`] | subject, group names | (applied to subject) |
//! | [`PasswordValidationCallback`] | username, password | result |
//! | [`PrivateKeyCallback`] | [`PrivateKeyRequest`] | key, certificate chain |
//! | [`SecretKeyCallback`] | [`SecretKeyRequest`] | key |
//! | [`TrustStoreCallback`] | - | trust store |
//! | [`CertStoreCallback`] | - | certificate store |
//!
//! Key material is zeroized when dropped.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::domain::error::AuthError;
use crate::domain::identity::{Principal, Subject};

/// DER-encoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate(pub Vec<u8>);

/// Encoded private key material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Symmetric key material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Assign the caller principal of `subject`, either as a principal or by name.
#[derive(Debug)]
pub struct CallerPrincipalCallback<'a> {
    pub subject: &'a mut Subject,
    pub principal: Option<Principal>,
    pub name: Option<String>,
}

impl<'a> CallerPrincipalCallback<'a> {
    pub fn with_name(subject: &'a mut Subject, name: impl Into<String>) -> Self {
        Self {
            subject,
            principal: None,
            name: Some(name.into()),
        }
    }

    pub fn with_principal(subject: &'a mut Subject, principal: Principal) -> Self {
        Self {
            subject,
            principal: Some(principal),
            name: None,
        }
    }
}

/// Assign group principals to `subject`.
#[derive(Debug)]
pub struct GroupPrincipalCallback<'a> {
    pub subject: &'a mut Subject,
    pub groups: Vec<String>,
}

/// Ask the runtime to validate a username/password pair.
pub struct PasswordValidationCallback {
    username: String,
    password: Option<Zeroizing<Vec<u8>>>,
    result: bool,
}

impl PasswordValidationCallback {
    pub fn new(username: impl Into<String>, password: Vec<u8>) -> Self {
        Self {
            username: username.into(),
            password: Some(Zeroizing::new(password)),
            result: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `None` once the password has been cleared.
    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_ref().map(|p| p.as_slice())
    }

    /// Wipe the password; later calls to [`Self::password`] return `None`.
    pub fn clear_password(&mut self) {
        self.password = None;
    }

    pub fn result(&self) -> bool {
        self.result
    }

    pub fn set_result(&mut self, result: bool) {
        self.result = result;
    }
}

impl fmt::Debug for PasswordValidationCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordValidationCallback")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("result", &self.result)
            .finish()
    }
}

/// How a private key is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateKeyRequest {
    Alias(String),
    IssuerSerial {
        issuer: String,
        /// Big-endian unsigned serial number.
        serial: Vec<u8>,
    },
    SubjectKeyId(Vec<u8>),
    Digest { digest: Vec<u8>, algorithm: String },
}

/// Ask the runtime for a private key and its certificate chain. A request of `None` asks
/// for the runtime's default key.
#[derive(Debug)]
pub struct PrivateKeyCallback {
    request: Option<PrivateKeyRequest>,
    key: Option<PrivateKey>,
    chain: Vec<Certificate>,
}

impl PrivateKeyCallback {
    pub fn new(request: Option<PrivateKeyRequest>) -> Self {
        Self {
            request,
            key: None,
            chain: Vec::new(),
        }
    }

    pub fn request(&self) -> Option<&PrivateKeyRequest> {
        self.request.as_ref()
    }

    pub fn key(&self) -> Option<&PrivateKey> {
        self.key.as_ref()
    }

    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }

    pub fn set_key(&mut self, key: PrivateKey, chain: Vec<Certificate>) {
        self.key = Some(key);
        self.chain = chain;
    }
}

/// How a secret key is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretKeyRequest {
    Alias(String),
}

impl SecretKeyRequest {
    pub const DEFAULT_ALIAS: &'static str = "Alias";

    /// Alias request; a missing alias falls back to [`Self::DEFAULT_ALIAS`].
    pub fn alias(alias: Option<&str>) -> Self {
        Self::Alias(alias.unwrap_or(Self::DEFAULT_ALIAS).to_string())
    }
}

#[derive(Debug)]
pub struct SecretKeyCallback {
    request: SecretKeyRequest,
    key: Option<SecretKey>,
}

impl SecretKeyCallback {
    pub fn new(request: SecretKeyRequest) -> Self {
        Self { request, key: None }
    }

    pub fn request(&self) -> &SecretKeyRequest {
        &self.request
    }

    pub fn key(&self) -> Option<&SecretKey> {
        self.key.as_ref()
    }

    pub fn set_key(&mut self, key: SecretKey) {
        self.key = Some(key);
    }
}

#[derive(Debug, Default)]
pub struct TrustStoreCallback {
    pub trust_store: Option<Vec<Certificate>>,
}

#[derive(Debug, Default)]
pub struct CertStoreCallback {
    pub cert_store: Option<Vec<Certificate>>,
}

/// One credential-resolution request handed to a [`CallbackHandler`].
#[derive(Debug)]
pub enum Callback<'a> {
    CallerPrincipal(CallerPrincipalCallback<'a>),
    GroupPrincipal(GroupPrincipalCallback<'a>),
    PasswordValidation(PasswordValidationCallback),
    PrivateKey(PrivateKeyCallback),
    SecretKey(SecretKeyCallback),
    TrustStore(TrustStoreCallback),
    CertStore(CertStoreCallback),
}

/// The runtime's credential resolver. Handlers answer what they can and fail with
/// [`AuthError::Callback`] on anything they cannot process.
pub trait CallbackHandler: Send + Sync {
    fn handle(&self, callbacks: &mut [Callback<'_>]) -> Result<(), AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_can_be_cleared() {
        let mut callback = PasswordValidationCallback::new("alice", b"s3cret".to_vec());
        assert_eq!(callback.password(), Some(&b"s3cret"[..]));
        callback.clear_password();
        assert!(callback.password().is_none());
        assert!(!callback.result());
    }

    #[test]
    fn test_secret_key_alias_default() {
        assert_eq!(
            SecretKeyRequest::alias(None),
            SecretKeyRequest::Alias("Alias".to_string())
        );
        assert_eq!(
            SecretKeyRequest::alias(Some("hmac")),
            SecretKeyRequest::Alias("hmac".to_string())
        );
    }

    #[test]
    fn test_key_material_is_redacted_in_debug() {
        let mut callback = PrivateKeyCallback::new(Some(PrivateKeyRequest::Alias("tls".into())));
        callback.set_key(PrivateKey::new(vec![1, 2, 3]), vec![Certificate(vec![9])]);
        let rendered = format!("{:?}", callback);
        assert!(rendered.contains("<redacted>"));
        assert_eq!(callback.chain().len(), 1);
    }
}

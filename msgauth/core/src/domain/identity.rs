// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Identity container: the principals and credentials a module reads from and
//! contributes to while processing a message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// The authenticated caller.
    Caller,
    /// A group the caller belongs to.
    Group,
    /// Any other named principal (service identity, realm, ...).
    Named,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub kind: PrincipalKind,
    pub name: String,
}

impl Principal {
    pub fn caller(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Caller,
            name: name.into(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Group,
            name: name.into(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Named,
            name: name.into(),
        }
    }
}

/// Mutable set of principals and credentials (the "subject" of an exchange).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    principals: BTreeSet<Principal>,
    #[serde(default)]
    public_credentials: Vec<Value>,
    #[serde(default, skip_serializing)]
    private_credentials: Vec<Value>,
}

impl Subject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principals(&self) -> impl Iterator<Item = &Principal> {
        self.principals.iter()
    }

    /// Returns `false` when the principal was already present.
    pub fn add_principal(&mut self, principal: Principal) -> bool {
        self.principals.insert(principal)
    }

    pub fn remove_principal(&mut self, principal: &Principal) -> bool {
        self.principals.remove(principal)
    }

    pub fn has_principal(&self, principal: &Principal) -> bool {
        self.principals.contains(principal)
    }

    /// The caller principal, if one has been assigned.
    pub fn caller(&self) -> Option<&Principal> {
        self.principals
            .iter()
            .find(|p| p.kind == PrincipalKind::Caller)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.principals
            .iter()
            .filter(|p| p.kind == PrincipalKind::Group)
            .map(|p| p.name.as_str())
    }

    pub fn public_credentials(&self) -> &[Value] {
        &self.public_credentials
    }

    pub fn add_public_credential(&mut self, credential: Value) {
        self.public_credentials.push(credential);
    }

    pub fn private_credentials(&self) -> &[Value] {
        &self.private_credentials
    }

    pub fn add_private_credential(&mut self, credential: Value) {
        self.private_credentials.push(credential);
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
            && self.public_credentials.is_empty()
            && self.private_credentials.is_empty()
    }
}

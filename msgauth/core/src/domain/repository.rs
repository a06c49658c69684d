// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Registry Collaborator Interfaces
//!
//! Contracts the registry depends on, implemented in `crate::infrastructure`.
//!
//! | Trait | Purpose | Implementations |
//! |-------|---------|----------------|
//! | `RegistrationStore` | declarative backing source for persistent registrations | `YamlRegistrationStore`, `InMemoryRegistrationStore` |
//! | `ProviderFactory` | resolves a declared class name + properties into a live provider | `ProviderCatalog` |
//!
//! Resolution through a `ProviderFactory` is always an explicit step taken before a
//! registration slot is touched, never something lookup does lazily.

use std::sync::Arc;

use crate::domain::auth_config::AuthConfigProvider;
use crate::domain::error::{RegistryError, StoreError};
use crate::domain::registration::{Properties, RegistrationKey};
use crate::domain::registry_manifest::DeclaredRegistration;

/// Persistence interface for declared (persistent) registrations.
/// At most one declaration exists per (layer, appContext) pair.
pub trait RegistrationStore: Send + Sync {
    /// All current declarations, in declaration order.
    fn load(&self) -> Result<Vec<DeclaredRegistration>, StoreError>;

    /// Save a declaration (create or replace for its pair).
    fn upsert(&self, declaration: &DeclaredRegistration) -> Result<(), StoreError>;

    /// Remove the declaration for `key`. Returns whether one was present.
    fn remove(&self, key: &RegistrationKey) -> Result<bool, StoreError>;
}

/// Turns a declared provider class into a live provider.
pub trait ProviderFactory: Send + Sync {
    fn create(
        &self,
        class_name: &str,
        properties: &Properties,
    ) -> Result<Arc<dyn AuthConfigProvider>, RegistryError>;
}

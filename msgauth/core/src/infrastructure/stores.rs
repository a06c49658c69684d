// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Registration Stores
//!
//! Implementations of [`RegistrationStore`]:
//! - **YamlRegistrationStore** - declarations kept in a `ProviderRegistry` manifest file
//! - **InMemoryRegistrationStore** - thread-safe manifest held in memory, for tests and
//!   embedded use
//!
//! Both serialize writers through a mutex so read-modify-write cycles on the manifest
//! never interleave.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::error::StoreError;
use crate::domain::registration::RegistrationKey;
use crate::domain::registry_manifest::{DeclaredRegistration, RegistryManifest};
use crate::domain::repository::RegistrationStore;

/// Declarations persisted to a YAML manifest file.
///
/// A missing file reads as an empty manifest and is created on the first write.
pub struct YamlRegistrationStore {
    path: PathBuf,
    manifest_name: String,
    write_lock: Mutex<()>,
}

impl YamlRegistrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            manifest_name: "default".to_string(),
            write_lock: Mutex::new(()),
        }
    }

    /// Name written to `metadata.name` when the store creates the file.
    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_manifest(&self) -> Result<RegistryManifest, StoreError> {
        if !self.path.exists() {
            debug!("Registration manifest {:?} does not exist yet", self.path);
            return Ok(RegistryManifest::new(self.manifest_name.clone()));
        }
        let manifest = RegistryManifest::from_yaml_file(&self.path)?;
        manifest
            .validate()
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        Ok(manifest)
    }
}

impl RegistrationStore for YamlRegistrationStore {
    fn load(&self) -> Result<Vec<DeclaredRegistration>, StoreError> {
        Ok(self.read_manifest()?.spec.registrations)
    }

    fn upsert(&self, declaration: &DeclaredRegistration) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let mut manifest = self.read_manifest()?;
        manifest.upsert(declaration.clone());
        manifest.to_yaml_file(&self.path)?;
        info!(
            "Persisted declaration '{}' for {} to {:?}",
            declaration.class_name,
            declaration.key(),
            self.path
        );
        Ok(())
    }

    fn remove(&self, key: &RegistrationKey) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        let mut manifest = self.read_manifest()?;
        if !manifest.remove(key) {
            return Ok(false);
        }
        manifest.to_yaml_file(&self.path)?;
        info!("Removed declaration for {} from {:?}", key, self.path);
        Ok(true)
    }
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryRegistrationStore {
    manifest: Mutex<RegistryManifest>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifest(manifest: RegistryManifest) -> Self {
        Self {
            manifest: Mutex::new(manifest),
        }
    }

    /// Replace every declaration at once, as an external edit of the backing source would.
    pub fn replace_all(&self, declarations: Vec<DeclaredRegistration>) {
        self.manifest.lock().spec.registrations = declarations;
    }

    pub fn snapshot(&self) -> RegistryManifest {
        self.manifest.lock().clone()
    }
}

impl RegistrationStore for InMemoryRegistrationStore {
    fn load(&self) -> Result<Vec<DeclaredRegistration>, StoreError> {
        Ok(self.manifest.lock().spec.registrations.clone())
    }

    fn upsert(&self, declaration: &DeclaredRegistration) -> Result<(), StoreError> {
        self.manifest.lock().upsert(declaration.clone());
        Ok(())
    }

    fn remove(&self, key: &RegistrationKey) -> Result<bool, StoreError> {
        Ok(self.manifest.lock().remove(key))
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Declarative Provider Registrations
//
// Kubernetes-style manifest listing the persistent provider registrations:
//
//   apiVersion: msgauth.io/v1
//   kind: ProviderRegistry
//   metadata:
//     name: edge-gateway
//   spec:
//     registrations:
//       - className: msgauth.basic
//         layer: HTTP
//         appContext: "server /api"
//         description: basic auth for the api
//         properties:
//           realm: api
//
// Instance registrations are never written here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::error::StoreError;
use crate::domain::registration::{Properties, RegistrationKey};

pub const API_VERSION: &str = "msgauth.io/v1";
pub const KIND: &str = "ProviderRegistry";

/// Top-level registration manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryManifest {
    /// API version (must be "msgauth.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ProviderRegistry")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: RegistrySpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySpec {
    #[serde(default)]
    pub registrations: Vec<DeclaredRegistration>,
}

/// One persistent registration: a provider class, its properties and the pair it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredRegistration {
    pub class_name: String,

    #[serde(default)]
    pub properties: Properties,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DeclaredRegistration {
    pub fn key(&self) -> RegistrationKey {
        RegistrationKey::new(self.layer.as_deref(), self.app_context.as_deref())
    }
}

impl Default for RegistryManifest {
    fn default() -> Self {
        Self::new("default")
    }
}

impl RegistryManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: name.into(),
                version: None,
                labels: None,
            },
            spec: RegistrySpec::default(),
        }
    }

    /// Parse a manifest from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, StoreError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a manifest from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Write the manifest to a YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Insert or replace the declaration for its (layer, appContext) pair.
    pub fn upsert(&mut self, declaration: DeclaredRegistration) {
        let key = declaration.key();
        match self
            .spec
            .registrations
            .iter_mut()
            .find(|existing| existing.key() == key)
        {
            Some(existing) => *existing = declaration,
            None => self.spec.registrations.push(declaration),
        }
    }

    /// Remove the declaration for `key`. Returns whether one was present.
    pub fn remove(&mut self, key: &RegistrationKey) -> bool {
        let before = self.spec.registrations.len();
        self.spec.registrations.retain(|d| &d.key() != key);
        before != self.spec.registrations.len()
    }

    /// Discover the manifest using precedence order
    /// 1. MSGAUTH_REGISTRY_PATH environment variable
    /// 2. ./msgauth-registry.yaml (working directory)
    /// 3. ~/.msgauth/registry.yaml (user home)
    /// 4. /etc/msgauth/registry.yaml (system, Unix) or C:\ProgramData\msgauth\registry.yaml (Windows)
    pub fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MSGAUTH_REGISTRY_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./msgauth-registry.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".msgauth").join("registry.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/msgauth/registry.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\msgauth\\registry.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load with discovery, falling back to an empty manifest
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading registrations from explicit path: {:?}", path);
            return Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load registrations at {:?}: {}", path, e)
            });
        }

        if let Some(path) = Self::discover() {
            tracing::info!("Loading registrations from discovered path: {:?}", path);
            Ok(Self::from_yaml_file(path)?)
        } else {
            tracing::warn!("No registration manifest found in standard locations. Using empty defaults.");
            Ok(Self::default())
        }
    }

    /// Validate manifest
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let mut seen = HashSet::new();
        for registration in &self.spec.registrations {
            if registration.class_name.trim().is_empty() {
                anyhow::bail!(
                    "className cannot be empty for registration {}",
                    registration.key()
                );
            }
            if !seen.insert(registration.key()) {
                anyhow::bail!(
                    "Duplicate registration for (layer, appContext) {}",
                    registration.key()
                );
            }
        }

        Ok(())
    }
}

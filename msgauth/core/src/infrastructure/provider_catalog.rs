// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Catalog - Declared Class Resolution
//
// Maps the class names used in declarative registrations to provider constructors.
// Built-in classes:
//
//   msgauth.basic        server-side Basic credential checking over JSON messages
//                        properties: realm, users ("name=sha256hex;..."), groups ("name=g1|g2;...")
//   msgauth.passthrough  no modules configured, every message passes unchanged

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::chain_config::{ContextBinding, ModuleEntry};
use crate::application::chain_provider::ChainAuthConfigProvider;
use crate::domain::auth_config::AuthConfigProvider;
use crate::domain::error::{AuthError, RegistryError};
use crate::domain::message_info::MessageType;
use crate::domain::message_policy::{MessagePolicy, ProtectionPolicy};
use crate::domain::module::ServerAuthModule;
use crate::domain::registration::Properties;
use crate::domain::repository::ProviderFactory;
use crate::infrastructure::credential_handler::InMemoryCredentialHandler;
use crate::infrastructure::modules::basic::{self, BasicCredentialModule};

pub const BASIC_CLASS: &str = "msgauth.basic";
pub const PASSTHROUGH_CLASS: &str = "msgauth.passthrough";

/// Auth context id served by `msgauth.basic` providers.
pub const BASIC_CONTEXT_ID: &str = "basic";

pub type ProviderConstructor =
    Arc<dyn Fn(&Properties) -> Result<Arc<dyn AuthConfigProvider>, AuthError> + Send + Sync>;

/// Registry of constructible provider classes
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    constructors: HashMap<String, ProviderConstructor>,
}

impl ProviderCatalog {
    /// Empty catalog; every declared class fails to resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in classes.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(BASIC_CLASS, build_basic_provider);
        catalog.register(PASSTHROUGH_CLASS, |_| {
            Ok(Arc::new(ChainAuthConfigProvider::builder().build()) as Arc<dyn AuthConfigProvider>)
        });
        catalog
    }

    /// Add or replace a class constructor.
    pub fn register<F>(&mut self, class_name: impl Into<String>, constructor: F)
    where
        F: Fn(&Properties) -> Result<Arc<dyn AuthConfigProvider>, AuthError> + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        debug!("Registering provider class '{}'", class_name);
        self.constructors.insert(class_name, Arc::new(constructor));
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
    }

    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ProviderFactory for ProviderCatalog {
    fn create(
        &self,
        class_name: &str,
        properties: &Properties,
    ) -> Result<Arc<dyn AuthConfigProvider>, RegistryError> {
        let constructor = self
            .constructors
            .get(class_name)
            .ok_or_else(|| RegistryError::UnknownProviderClass(class_name.to_string()))?;

        let provider = constructor(properties).map_err(|source| RegistryError::ProviderConstruction {
            class_name: class_name.to_string(),
            source,
        })?;
        info!("Constructed provider of class '{}'", class_name);
        Ok(provider)
    }
}

/// Build the credential handler from a `users` property.
fn basic_handler(properties: &Properties) -> Result<InMemoryCredentialHandler, AuthError> {
    let mut handler = InMemoryCredentialHandler::new();

    let users = properties.get("users").map(String::as_str).unwrap_or("");
    for entry in users.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, digest) = entry.split_once('=').ok_or_else(|| {
            AuthError::Initialization {
                module: basic::MODULE_NAME.to_string(),
                reason: format!("user entry '{}' is not name=sha256hex", entry),
            }
        })?;
        handler = handler.with_user_digest(name.trim(), digest)?;
    }
    Ok(handler)
}

fn build_basic_provider(properties: &Properties) -> Result<Arc<dyn AuthConfigProvider>, AuthError> {
    let handler = basic_handler(properties)?;
    info!(
        "Configured {} provider with {} users",
        BASIC_CLASS,
        handler.user_count()
    );

    let mut entry: ModuleEntry<dyn ServerAuthModule> =
        ModuleEntry::new(|| Box::new(BasicCredentialModule::new()) as Box<dyn ServerAuthModule>)
            .with_request_policy(MessagePolicy::single(ProtectionPolicy::AuthenticateSender, true));
    entry.options = basic::module_options(properties);

    let provider = ChainAuthConfigProvider::builder()
        .server_context(
            ContextBinding::new(BASIC_CONTEXT_ID)
                .for_message_type(MessageType::of::<serde_json::Value>())
                .with_module(entry),
        )
        .default_handler(Arc::new(handler))
        .build();
    Ok(Arc::new(provider))
}

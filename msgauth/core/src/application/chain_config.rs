// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Auth Config Resolution
//!
//! A [`ChainAuthConfig`] maps auth context identifiers to ordered module entries and
//! builds fresh, fully-initialized [`ChainServerAuthContext`] / [`ChainClientAuthContext`]
//! instances from them on demand.
//!
//! The definition a config reads lives behind a shared cell owned by its provider. A
//! config works from its own snapshot of that cell until [`AuthConfig::refresh`] is
//! called, so contexts built between two refreshes agree on the module list.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::chain_context::{ChainClientAuthContext, ChainServerAuthContext, ModuleBinding};
use crate::domain::auth_config::{
    AuthConfig, ClientAuthConfig, ClientAuthContext, ServerAuthConfig, ServerAuthContext,
};
use crate::domain::callback::CallbackHandler;
use crate::domain::error::AuthError;
use crate::domain::identity::Subject;
use crate::domain::message_info::{MessageInfo, MessageType};
use crate::domain::message_policy::MessagePolicy;
use crate::domain::module::{AuthModule, ClientAuthModule, ModuleInit, ServerAuthModule};
use crate::domain::registration::Properties;

/// Builds a fresh, uninitialized module.
pub type ModuleFactory<M> = Arc<dyn Fn() -> Box<M> + Send + Sync>;

/// One position in a context's module chain.
pub struct ModuleEntry<M: ?Sized> {
    pub factory: ModuleFactory<M>,
    pub request_policy: Option<MessagePolicy>,
    pub response_policy: Option<MessagePolicy>,
    pub options: Properties,
}

impl<M: ?Sized> ModuleEntry<M> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Box<M> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            request_policy: None,
            response_policy: None,
            options: Properties::new(),
        }
    }

    pub fn with_request_policy(mut self, policy: MessagePolicy) -> Self {
        self.request_policy = Some(policy);
        self
    }

    pub fn with_response_policy(mut self, policy: MessagePolicy) -> Self {
        self.response_policy = Some(policy);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

impl<M: ?Sized> Clone for ModuleEntry<M> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            request_policy: self.request_policy.clone(),
            response_policy: self.response_policy.clone(),
            options: self.options.clone(),
        }
    }
}

impl<M: ?Sized> fmt::Debug for ModuleEntry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("request_policy", &self.request_policy)
            .field("response_policy", &self.response_policy)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// An auth context identifier with the module chain it runs.
pub struct ContextBinding<M: ?Sized> {
    pub id: String,
    /// Request message type this context serves. `None` serves any type.
    pub message_type: Option<MessageType>,
    pub entries: Vec<ModuleEntry<M>>,
}

impl<M: ?Sized> ContextBinding<M> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_type: None,
            entries: Vec::new(),
        }
    }

    pub fn for_message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    pub fn with_module(mut self, entry: ModuleEntry<M>) -> Self {
        self.entries.push(entry);
        self
    }

    fn serves(&self, request_type: Option<MessageType>) -> bool {
        match self.message_type {
            None => true,
            Some(t) => request_type == Some(t),
        }
    }
}

impl<M: ?Sized> Clone for ContextBinding<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            message_type: self.message_type,
            entries: self.entries.clone(),
        }
    }
}

impl<M: ?Sized> fmt::Debug for ContextBinding<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBinding")
            .field("id", &self.id)
            .field("message_type", &self.message_type)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Ordered context bindings of one side (client or server).
pub struct ChainDefinition<M: ?Sized> {
    pub contexts: Vec<ContextBinding<M>>,
}

impl<M: ?Sized> ChainDefinition<M> {
    pub fn new(contexts: Vec<ContextBinding<M>>) -> Self {
        Self { contexts }
    }

    pub fn context(&self, id: &str) -> Option<&ContextBinding<M>> {
        self.contexts.iter().find(|c| c.id == id)
    }
}

impl<M: ?Sized> Default for ChainDefinition<M> {
    fn default() -> Self {
        Self {
            contexts: Vec::new(),
        }
    }
}

impl<M: ?Sized> Clone for ChainDefinition<M> {
    fn clone(&self) -> Self {
        Self {
            contexts: self.contexts.clone(),
        }
    }
}

/// Shared, swappable definition cell.
pub type SharedDefinition<M> = Arc<RwLock<Arc<ChainDefinition<M>>>>;

pub fn shared_definition<M: ?Sized>(definition: ChainDefinition<M>) -> SharedDefinition<M> {
    Arc::new(RwLock::new(Arc::new(definition)))
}

/// Auth config over chain definitions. `M` is `dyn ServerAuthModule` or
/// `dyn ClientAuthModule`.
pub struct ChainAuthConfig<M: ?Sized> {
    layer: String,
    app_context: String,
    handler: Arc<dyn CallbackHandler>,
    shared: SharedDefinition<M>,
    snapshot: RwLock<Arc<ChainDefinition<M>>>,
}

impl<M: AuthModule + ?Sized> ChainAuthConfig<M> {
    pub fn new(
        layer: impl Into<String>,
        app_context: impl Into<String>,
        handler: Arc<dyn CallbackHandler>,
        shared: SharedDefinition<M>,
    ) -> Self {
        let snapshot = shared.read().clone();
        Self {
            layer: layer.into(),
            app_context: app_context.into(),
            handler,
            shared,
            snapshot: RwLock::new(snapshot),
        }
    }

    fn definition(&self) -> Arc<ChainDefinition<M>> {
        self.snapshot.read().clone()
    }

    /// Construct and initialize the modules of `auth_context_id`.
    ///
    /// `Ok(None)` when the id is unknown or has no modules.
    fn build_bindings(
        &self,
        auth_context_id: &str,
        subject: Option<&Subject>,
        properties: &Properties,
    ) -> Result<Option<Vec<ModuleBinding<M>>>, AuthError> {
        let definition = self.definition();
        let Some(context) = definition.context(auth_context_id) else {
            debug!(
                "No auth context '{}' for ({}, {})",
                auth_context_id, self.layer, self.app_context
            );
            return Ok(None);
        };

        if context.entries.is_empty() {
            return Ok(None);
        }

        let mut bindings = Vec::with_capacity(context.entries.len());
        for entry in &context.entries {
            let mut module = (entry.factory)();

            let mut options = entry.options.clone();
            options.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));

            let init = ModuleInit {
                request_policy: entry.request_policy.as_ref(),
                response_policy: entry.response_policy.as_ref(),
                handler: self.handler.clone(),
                options: &options,
                subject,
            };

            module.initialize(init).map_err(|e| match e {
                AuthError::Initialization { .. } => e,
                other => AuthError::Initialization {
                    module: module.name().to_string(),
                    reason: other.to_string(),
                },
            })?;

            bindings.push(ModuleBinding::new(
                Arc::from(module),
                entry.request_policy.clone(),
                entry.response_policy.clone(),
            ));
        }

        info!(
            "Built auth context '{}' for ({}, {}) with {} modules",
            auth_context_id,
            self.layer,
            self.app_context,
            bindings.len()
        );
        Ok(Some(bindings))
    }
}

impl<M: AuthModule + ?Sized> AuthConfig for ChainAuthConfig<M> {
    fn message_layer(&self) -> &str {
        &self.layer
    }

    fn app_context(&self) -> &str {
        &self.app_context
    }

    fn auth_context_id(&self, info: &MessageInfo) -> Option<String> {
        let request_type = info.request().map(|m| m.message_type());
        self.definition()
            .contexts
            .iter()
            .find(|c| c.serves(request_type))
            .map(|c| c.id.clone())
    }

    fn is_protected(&self) -> bool {
        self.definition().contexts.iter().any(|c| {
            c.entries.iter().any(|e| {
                e.request_policy
                    .as_ref()
                    .is_some_and(MessagePolicy::is_mandatory)
            })
        })
    }

    fn refresh(&self) {
        let latest = self.shared.read().clone();
        *self.snapshot.write() = latest;
        debug!("Refreshed auth config ({}, {})", self.layer, self.app_context);
    }
}

impl ServerAuthConfig for ChainAuthConfig<dyn ServerAuthModule> {
    fn auth_context(
        &self,
        auth_context_id: &str,
        service_subject: Option<&Subject>,
        properties: &Properties,
    ) -> Result<Option<Arc<dyn ServerAuthContext>>, AuthError> {
        Ok(self
            .build_bindings(auth_context_id, service_subject, properties)?
            .map(|bindings| Arc::new(ChainServerAuthContext::new(bindings)) as Arc<dyn ServerAuthContext>))
    }
}

impl ClientAuthConfig for ChainAuthConfig<dyn ClientAuthModule> {
    fn auth_context(
        &self,
        auth_context_id: &str,
        client_subject: Option<&Subject>,
        properties: &Properties,
    ) -> Result<Option<Arc<dyn ClientAuthContext>>, AuthError> {
        Ok(self
            .build_bindings(auth_context_id, client_subject, properties)?
            .map(|bindings| Arc::new(ChainClientAuthContext::new(bindings)) as Arc<dyn ClientAuthContext>))
    }
}

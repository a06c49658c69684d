// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Chain-backed [`AuthConfigProvider`].
//!
//! The provider owns one shared definition per side. Configs handed out by the provider
//! read those definitions; [`ChainAuthConfigProvider::stage_server_definition`] and
//! [`ChainAuthConfigProvider::stage_client_definition`] prepare a replacement that becomes
//! visible on the next [`AuthConfigProvider::refresh`] (and, per config, on the config's
//! own `refresh`).

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::chain_config::{
    shared_definition, ChainAuthConfig, ChainDefinition, ContextBinding, SharedDefinition,
};
use crate::domain::auth_config::{AuthConfigProvider, ClientAuthConfig, ServerAuthConfig};
use crate::domain::callback::{Callback, CallbackHandler};
use crate::domain::error::AuthError;
use crate::domain::module::{ClientAuthModule, ServerAuthModule};

/// Handler used when neither the caller nor the provider supplies one.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedCallbackHandler;

impl CallbackHandler for UnsupportedCallbackHandler {
    fn handle(&self, callbacks: &mut [Callback<'_>]) -> Result<(), AuthError> {
        if callbacks.is_empty() {
            return Ok(());
        }
        Err(AuthError::Callback(
            "no credential handler configured".to_string(),
        ))
    }
}

pub struct ChainAuthConfigProvider {
    server: SharedDefinition<dyn ServerAuthModule>,
    client: SharedDefinition<dyn ClientAuthModule>,
    staged_server: Mutex<Option<ChainDefinition<dyn ServerAuthModule>>>,
    staged_client: Mutex<Option<ChainDefinition<dyn ClientAuthModule>>>,
    default_handler: Arc<dyn CallbackHandler>,
}

impl ChainAuthConfigProvider {
    pub fn builder() -> ChainAuthConfigProviderBuilder {
        ChainAuthConfigProviderBuilder::default()
    }

    /// Prepare a new server-side definition, applied on the next refresh.
    pub fn stage_server_definition(&self, definition: ChainDefinition<dyn ServerAuthModule>) {
        *self.staged_server.lock() = Some(definition);
    }

    /// Prepare a new client-side definition, applied on the next refresh.
    pub fn stage_client_definition(&self, definition: ChainDefinition<dyn ClientAuthModule>) {
        *self.staged_client.lock() = Some(definition);
    }

    pub fn server_context_ids(&self) -> Vec<String> {
        self.server.read().contexts.iter().map(|c| c.id.clone()).collect()
    }

    pub fn client_context_ids(&self) -> Vec<String> {
        self.client.read().contexts.iter().map(|c| c.id.clone()).collect()
    }

    fn handler_or_default(&self, handler: Option<Arc<dyn CallbackHandler>>) -> Arc<dyn CallbackHandler> {
        handler.unwrap_or_else(|| self.default_handler.clone())
    }
}

impl AuthConfigProvider for ChainAuthConfigProvider {
    fn client_auth_config(
        &self,
        layer: &str,
        app_context: &str,
        handler: Option<Arc<dyn CallbackHandler>>,
    ) -> Result<Arc<dyn ClientAuthConfig>, AuthError> {
        debug!("Handing out client auth config for ({}, {})", layer, app_context);
        Ok(Arc::new(ChainAuthConfig::new(
            layer,
            app_context,
            self.handler_or_default(handler),
            self.client.clone(),
        )))
    }

    fn server_auth_config(
        &self,
        layer: &str,
        app_context: &str,
        handler: Option<Arc<dyn CallbackHandler>>,
    ) -> Result<Arc<dyn ServerAuthConfig>, AuthError> {
        debug!("Handing out server auth config for ({}, {})", layer, app_context);
        Ok(Arc::new(ChainAuthConfig::new(
            layer,
            app_context,
            self.handler_or_default(handler),
            self.server.clone(),
        )))
    }

    fn refresh(&self) {
        if let Some(definition) = self.staged_server.lock().take() {
            info!("Applying {} staged server auth contexts", definition.contexts.len());
            *self.server.write() = Arc::new(definition);
        }
        if let Some(definition) = self.staged_client.lock().take() {
            info!("Applying {} staged client auth contexts", definition.contexts.len());
            *self.client.write() = Arc::new(definition);
        }
    }
}

#[derive(Default)]
pub struct ChainAuthConfigProviderBuilder {
    server: Vec<ContextBinding<dyn ServerAuthModule>>,
    client: Vec<ContextBinding<dyn ClientAuthModule>>,
    handler: Option<Arc<dyn CallbackHandler>>,
}

impl ChainAuthConfigProviderBuilder {
    pub fn server_context(mut self, binding: ContextBinding<dyn ServerAuthModule>) -> Self {
        self.server.push(binding);
        self
    }

    pub fn client_context(mut self, binding: ContextBinding<dyn ClientAuthModule>) -> Self {
        self.client.push(binding);
        self
    }

    pub fn default_handler(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> ChainAuthConfigProvider {
        ChainAuthConfigProvider {
            server: shared_definition(ChainDefinition::new(self.server)),
            client: shared_definition(ChainDefinition::new(self.client)),
            staged_server: Mutex::new(None),
            staged_client: Mutex::new(None),
            default_handler: self
                .handler
                .unwrap_or_else(|| Arc::new(UnsupportedCallbackHandler)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chain_config::ModuleEntry;
    use crate::domain::identity::Subject;
    use crate::domain::message_info::{MessageInfo, MessageType};
    use crate::domain::module::{AuthModule, ModuleInit};
    use crate::domain::registration::Properties;
    use crate::domain::status::AuthStatus;
    use serde_json::json;

    struct Tagging;

    impl AuthModule for Tagging {
        fn name(&self) -> &str {
            "tagging"
        }

        fn supported_message_types(&self) -> Vec<MessageType> {
            Vec::new()
        }

        fn initialize(&mut self, _init: ModuleInit<'_>) -> Result<(), AuthError> {
            Ok(())
        }
    }

    impl ClientAuthModule for Tagging {
        fn secure_request(
            &self,
            info: &mut MessageInfo,
            _client_subject: &mut Subject,
        ) -> Result<AuthStatus, AuthError> {
            info.map().insert("tagged".to_string(), json!(true));
            Ok(AuthStatus::Success)
        }

        fn validate_response(
            &self,
            _info: &mut MessageInfo,
            _client_subject: &mut Subject,
            _service_subject: Option<&mut Subject>,
        ) -> Result<AuthStatus, AuthError> {
            Ok(AuthStatus::Success)
        }

        fn clean_subject(&self, _info: &mut MessageInfo, _subject: &mut Subject) -> Result<(), AuthError> {
            Ok(())
        }
    }

    fn tagging_binding(id: &str) -> ContextBinding<dyn ClientAuthModule> {
        ContextBinding::new(id).with_module(ModuleEntry::new(|| Box::new(Tagging) as Box<dyn ClientAuthModule>))
    }

    #[test]
    fn test_client_config_builds_working_context() {
        let provider = ChainAuthConfigProvider::builder()
            .client_context(tagging_binding("default"))
            .build();

        let config = provider.client_auth_config("HTTP", "client", None).unwrap();
        let mut info = MessageInfo::with_request(json!({"q": 1}));
        let id = config.auth_context_id(&info).unwrap();
        let ctx = config.auth_context(&id, None, &Properties::new()).unwrap().unwrap();

        let status = ctx.secure_request(&mut info, &mut Subject::new()).unwrap();
        assert_eq!(status, AuthStatus::Success);
        assert_eq!(info.map().get("tagged"), Some(&json!(true)));
    }

    #[test]
    fn test_server_side_without_contexts_passes_through() {
        let provider = ChainAuthConfigProvider::builder().build();
        let config = provider.server_auth_config("HTTP", "server", None).unwrap();
        let info = MessageInfo::with_request(json!({}));
        assert!(config.auth_context_id(&info).is_none());
        assert!(config.auth_context("any", None, &Properties::new()).unwrap().is_none());
    }

    #[test]
    fn test_staged_definition_applies_on_refresh() {
        let provider = ChainAuthConfigProvider::builder()
            .client_context(tagging_binding("v1"))
            .build();
        let config = provider.client_auth_config("HTTP", "client", None).unwrap();

        provider.stage_client_definition(ChainDefinition::new(vec![tagging_binding("v2")]));
        assert_eq!(provider.client_context_ids(), vec!["v1"]);

        provider.refresh();
        assert_eq!(provider.client_context_ids(), vec!["v2"]);

        let info = MessageInfo::with_request(json!({}));
        assert_eq!(config.auth_context_id(&info).as_deref(), Some("v1"));
        config.refresh();
        assert_eq!(config.auth_context_id(&info).as_deref(), Some("v2"));
    }

    #[test]
    fn test_default_handler_rejects_callbacks() {
        let handler = UnsupportedCallbackHandler;
        assert!(handler.handle(&mut []).is_ok());

        let mut subject = Subject::new();
        let mut callbacks = [Callback::CallerPrincipal(
            crate::domain::callback::CallerPrincipalCallback::with_name(&mut subject, "alice"),
        )];
        assert!(matches!(handler.handle(&mut callbacks), Err(AuthError::Callback(_))));
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Auth Configs, Auth Contexts and Providers
//!
//! ```text
//! AuthConfigProvider ──client_auth_config / server_auth_config──► AuthConfig
//!   AuthConfig ──auth_context(id, subject, properties)──► AuthContext (or None = pass through)
//!     AuthContext ──secure / validate / clean──► ordered module chain
//! ```
//!
//! The runtime only ever talks to these traits; which modules sit behind a context and
//! how they cooperate is the provider's business.

use std::sync::Arc;

use crate::domain::callback::CallbackHandler;
use crate::domain::error::AuthError;
use crate::domain::identity::Subject;
use crate::domain::message_info::MessageInfo;
use crate::domain::registration::Properties;
use crate::domain::status::AuthStatus;

/// Client-side processing for one layer/application context binding.
pub trait ClientAuthContext: Send + Sync {
    fn secure_request(
        &self,
        info: &mut MessageInfo,
        client_subject: &mut Subject,
    ) -> Result<AuthStatus, AuthError>;

    fn validate_response(
        &self,
        info: &mut MessageInfo,
        client_subject: &mut Subject,
        service_subject: Option<&mut Subject>,
    ) -> Result<AuthStatus, AuthError>;

    fn clean_subject(&self, info: &mut MessageInfo, subject: &mut Subject)
        -> Result<(), AuthError>;
}

/// Server-side processing for one layer/application context binding.
pub trait ServerAuthContext: Send + Sync {
    fn validate_request(
        &self,
        info: &mut MessageInfo,
        client_subject: &mut Subject,
        service_subject: Option<&mut Subject>,
    ) -> Result<AuthStatus, AuthError>;

    fn secure_response(
        &self,
        info: &mut MessageInfo,
        service_subject: Option<&mut Subject>,
    ) -> Result<AuthStatus, AuthError>;

    fn clean_subject(&self, info: &mut MessageInfo, subject: &mut Subject)
        -> Result<(), AuthError>;
}

/// Shared surface of client and server configs.
pub trait AuthConfig: Send + Sync {
    fn message_layer(&self) -> &str;

    fn app_context(&self) -> &str;

    /// Identifier of the auth context that applies to this exchange, if any.
    fn auth_context_id(&self, info: &MessageInfo) -> Option<String>;

    /// Whether any context of this config enforces mandatory request protection.
    fn is_protected(&self) -> bool;

    fn refresh(&self);
}

pub trait ClientAuthConfig: AuthConfig {
    /// `Ok(None)` means no modules are configured and messages pass through unchanged.
    fn auth_context(
        &self,
        auth_context_id: &str,
        client_subject: Option<&Subject>,
        properties: &Properties,
    ) -> Result<Option<Arc<dyn ClientAuthContext>>, AuthError>;
}

pub trait ServerAuthConfig: AuthConfig {
    /// `Ok(None)` means no modules are configured and messages pass through unchanged.
    fn auth_context(
        &self,
        auth_context_id: &str,
        service_subject: Option<&Subject>,
        properties: &Properties,
    ) -> Result<Option<Arc<dyn ServerAuthContext>>, AuthError>;
}

/// Factory for client and server configs, the unit that gets registered.
pub trait AuthConfigProvider: Send + Sync {
    /// `handler = None` lets the provider fall back to its own default handler.
    fn client_auth_config(
        &self,
        layer: &str,
        app_context: &str,
        handler: Option<Arc<dyn CallbackHandler>>,
    ) -> Result<Arc<dyn ClientAuthConfig>, AuthError>;

    fn server_auth_config(
        &self,
        layer: &str,
        app_context: &str,
        handler: Option<Arc<dyn CallbackHandler>>,
    ) -> Result<Arc<dyn ServerAuthConfig>, AuthError>;

    fn refresh(&self);
}

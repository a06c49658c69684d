// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Authentication Modules
//!
//! A module secures or validates one direction of traffic. Client modules secure
//! outgoing requests and validate incoming responses; server modules validate incoming
//! requests and secure outgoing responses. Both clean up what they contributed to a
//! subject.
//!
//! Modules are constructed fresh for each auth context, initialized exactly once with
//! their [`ModuleInit`], and then shared read-only across concurrent exchanges. Any
//! mutable state a module keeps after initialization is its own to guard.

use std::sync::Arc;

use crate::domain::callback::CallbackHandler;
use crate::domain::error::AuthError;
use crate::domain::identity::Subject;
use crate::domain::message_info::{MessageInfo, MessageType};
use crate::domain::message_policy::MessagePolicy;
use crate::domain::registration::Properties;
use crate::domain::status::AuthStatus;

/// Everything a module receives at initialization.
pub struct ModuleInit<'a> {
    /// `None` means the module has no request protection to apply.
    pub request_policy: Option<&'a MessagePolicy>,
    /// `None` means the module has no response protection to apply.
    pub response_policy: Option<&'a MessagePolicy>,
    pub handler: Arc<dyn CallbackHandler>,
    pub options: &'a Properties,
    /// Identity the owning context was built for, if any.
    pub subject: Option<&'a Subject>,
}

/// Capabilities shared by client and server modules.
pub trait AuthModule: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Message types this module can process. Empty means any type.
    fn supported_message_types(&self) -> Vec<MessageType>;

    /// Called exactly once, before the module's first use.
    fn initialize(&mut self, init: ModuleInit<'_>) -> Result<(), AuthError>;
}

/// Client side: secure the request, validate the response.
pub trait ClientAuthModule: AuthModule {
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

/// Server side: validate the request, secure the response.
pub trait ServerAuthModule: AuthModule {
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

/// Whether a module declaring `supported` can process `message_type`.
pub fn supports(supported: &[MessageType], message_type: Option<MessageType>) -> bool {
    match message_type {
        None => true,
        Some(t) => supported.is_empty() || supported.contains(&t),
    }
}

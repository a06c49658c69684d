// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP-Basic style credential module over JSON messages.
//!
//! Requests are `serde_json::Value` objects carrying an `authorization` field of the form
//! `Basic base64(user:password)`. Staged responses are JSON objects with a `status` code.
//!
//! | Request | Staged response | Status |
//! |---------|-----------------|--------|
//! | no `authorization` (mandatory protection) | `401` challenge | `SendContinue` |
//! | no `authorization` (optional protection) | - | `Success` |
//! | malformed or wrong credentials | `401` | `SendFailure` |
//! | valid credentials | - | `Success` |

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::domain::callback::{
    Callback, CallbackHandler, CallerPrincipalCallback, GroupPrincipalCallback,
    PasswordValidationCallback,
};
use crate::domain::error::AuthError;
use crate::domain::identity::{Principal, Subject};
use crate::domain::message_info::{MessageInfo, MessageType};
use crate::domain::message_policy::MessagePolicy;
use crate::domain::module::{AuthModule, ModuleInit, ServerAuthModule};
use crate::domain::registration::Properties;
use crate::domain::status::AuthStatus;

pub const MODULE_NAME: &str = "basic-credential";
pub const DEFAULT_REALM: &str = "msgauth";

/// Scratch-map key holding the user this module authenticated in the current exchange.
pub const AUTHENTICATED_USER_KEY: &str = "msgauth.basic.user";

const AUTHORIZATION_FIELD: &str = "authorization";

/// Parse `name=g1|g2;other=g3` group assignments.
pub fn parse_group_table(spec: &str) -> HashMap<String, Vec<String>> {
    spec.split(';')
        .filter_map(|entry| entry.split_once('='))
        .map(|(user, groups)| {
            let groups = groups
                .split('|')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect();
            (user.trim().to_string(), groups)
        })
        .filter(|(user, _)| !user.is_empty())
        .collect()
}

#[derive(Default)]
pub struct BasicCredentialModule {
    realm: String,
    groups: HashMap<String, Vec<String>>,
    handler: Option<Arc<dyn CallbackHandler>>,
    request_policy: Option<MessagePolicy>,
}

impl BasicCredentialModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn handler(&self) -> Result<&Arc<dyn CallbackHandler>, AuthError> {
        self.handler
            .as_ref()
            .ok_or_else(|| AuthError::module(MODULE_NAME, "module used before initialization"))
    }

    fn credentials_optional(&self) -> bool {
        self.request_policy
            .as_ref()
            .is_some_and(|p| !p.is_mandatory())
    }

    fn challenge(&self) -> Value {
        json!({
            "status": 401,
            "headers": {
                "www-authenticate": format!("Basic realm=\"{}\"", self.realm)
            }
        })
    }

    fn rejection(&self, reason: &str) -> Value {
        json!({
            "status": 401,
            "error": reason,
        })
    }

    /// Split `Basic <base64>` into (user, password).
    fn decode_authorization(header: &str) -> Option<(String, Zeroizing<Vec<u8>>)> {
        let (scheme, encoded) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = Zeroizing::new(STANDARD.decode(encoded.trim()).ok()?);
        let separator = decoded.iter().position(|b| *b == b':')?;
        let user = std::str::from_utf8(&decoded[..separator]).ok()?.to_string();
        if user.is_empty() {
            return None;
        }
        let password = Zeroizing::new(decoded[separator + 1..].to_vec());
        Some((user, password))
    }
}

impl AuthModule for BasicCredentialModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn supported_message_types(&self) -> Vec<MessageType> {
        vec![MessageType::of::<Value>()]
    }

    fn initialize(&mut self, init: ModuleInit<'_>) -> Result<(), AuthError> {
        self.realm = init
            .options
            .get("realm")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REALM.to_string());
        self.groups = init
            .options
            .get("groups")
            .map(|spec| parse_group_table(spec))
            .unwrap_or_default();
        self.request_policy = init.request_policy.cloned();
        self.handler = Some(init.handler);

        debug!(
            "Initialized {} for realm '{}' ({} group assignments)",
            MODULE_NAME,
            self.realm,
            self.groups.len()
        );
        Ok(())
    }
}

impl ServerAuthModule for BasicCredentialModule {
    fn validate_request(
        &self,
        info: &mut MessageInfo,
        client_subject: &mut Subject,
        _service_subject: Option<&mut Subject>,
    ) -> Result<AuthStatus, AuthError> {
        let handler = self.handler()?.clone();

        let request = info
            .request_as::<Value>()
            .ok_or_else(|| AuthError::failed("no request message to validate"))?;
        let authorization = request
            .get(AUTHORIZATION_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string);

        let Some(authorization) = authorization else {
            if self.credentials_optional() {
                debug!("No credentials presented, protection is optional");
                return Ok(AuthStatus::Success);
            }
            debug!("No credentials presented, challenging for realm '{}'", self.realm);
            info.set_response(self.challenge());
            return Ok(AuthStatus::SendContinue);
        };

        let Some((user, password)) = Self::decode_authorization(&authorization) else {
            warn!("Malformed authorization header");
            info.set_response(self.rejection("malformed credentials"));
            return Ok(AuthStatus::SendFailure);
        };

        let mut callbacks = [Callback::PasswordValidation(PasswordValidationCallback::new(
            user.clone(),
            password.to_vec(),
        ))];
        handler.handle(&mut callbacks)?;
        let accepted = matches!(&callbacks[0], Callback::PasswordValidation(cb) if cb.result());

        if !accepted {
            warn!("Rejected credentials for user '{}'", user);
            info.set_response(self.rejection("invalid credentials"));
            return Ok(AuthStatus::SendFailure);
        }

        handler.handle(&mut [Callback::CallerPrincipal(
            CallerPrincipalCallback::with_name(client_subject, user.clone()),
        )])?;

        if let Some(groups) = self.groups.get(&user).filter(|g| !g.is_empty()) {
            handler.handle(&mut [Callback::GroupPrincipal(GroupPrincipalCallback {
                subject: client_subject,
                groups: groups.clone(),
            })])?;
        }

        info.map()
            .insert(AUTHENTICATED_USER_KEY.to_string(), Value::String(user.clone()));
        info!("Authenticated user '{}' in realm '{}'", user, self.realm);
        Ok(AuthStatus::Success)
    }

    fn secure_response(
        &self,
        _info: &mut MessageInfo,
        _service_subject: Option<&mut Subject>,
    ) -> Result<AuthStatus, AuthError> {
        Ok(AuthStatus::SendSuccess)
    }

    fn clean_subject(&self, info: &mut MessageInfo, subject: &mut Subject) -> Result<(), AuthError> {
        let user = info
            .peek_map()
            .and_then(|m| m.get(AUTHENTICATED_USER_KEY))
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(user) = user {
            subject.remove_principal(&Principal::caller(user.clone()));
            for group in self.groups.get(&user).into_iter().flatten() {
                subject.remove_principal(&Principal::group(group.clone()));
            }
            debug!("Removed principals contributed for '{}'", user);
        }
        Ok(())
    }
}

/// Options for a [`BasicCredentialModule`] entry.
pub fn module_options(properties: &Properties) -> Properties {
    properties
        .iter()
        .filter(|(k, _)| k.as_str() == "realm" || k.as_str() == "groups")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message_policy::ProtectionPolicy;
    use crate::infrastructure::credential_handler::InMemoryCredentialHandler;

    fn initialized(policy: Option<MessagePolicy>) -> BasicCredentialModule {
        let handler: Arc<dyn CallbackHandler> =
            Arc::new(InMemoryCredentialHandler::new().with_user("alice", "wonderland"));
        let mut options = Properties::new();
        options.insert("realm".to_string(), "api".to_string());
        options.insert("groups".to_string(), "alice=admins|ops".to_string());

        let mut module = BasicCredentialModule::new();
        module
            .initialize(ModuleInit {
                request_policy: policy.as_ref(),
                response_policy: None,
                handler,
                options: &options,
                subject: None,
            })
            .unwrap();
        module
    }

    fn request_with(authorization: Option<String>) -> MessageInfo {
        let mut body = json!({"path": "/orders"});
        if let Some(value) = authorization {
            body[AUTHORIZATION_FIELD] = Value::String(value);
        }
        MessageInfo::with_request(body)
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
    }

    #[test]
    fn test_parse_group_table() {
        let table = parse_group_table("alice=admins|ops; bob=users;=nobody;broken");
        assert_eq!(table.get("alice").unwrap(), &vec!["admins".to_string(), "ops".to_string()]);
        assert_eq!(table.get("bob").unwrap(), &vec!["users".to_string()]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_missing_credentials_challenge() {
        let module = initialized(None);
        let mut info = request_with(None);
        let status = module
            .validate_request(&mut info, &mut Subject::new(), None)
            .unwrap();
        assert_eq!(status, AuthStatus::SendContinue);

        let response = info.response_as::<Value>().unwrap();
        assert_eq!(response["status"], 401);
        assert_eq!(response["headers"]["www-authenticate"], "Basic realm=\"api\"");
    }

    #[test]
    fn test_missing_credentials_with_optional_policy() {
        let module = initialized(Some(MessagePolicy::single(
            ProtectionPolicy::AuthenticateSender,
            false,
        )));
        let mut info = request_with(None);
        let status = module
            .validate_request(&mut info, &mut Subject::new(), None)
            .unwrap();
        assert_eq!(status, AuthStatus::Success);
        assert!(info.response().is_none());
    }

    #[test]
    fn test_bad_credentials_fail() {
        let module = initialized(None);
        for header in [basic("alice", "nope"), "Basic !!!".to_string(), "Bearer abc".to_string()] {
            let mut info = request_with(Some(header));
            let mut subject = Subject::new();
            let status = module.validate_request(&mut info, &mut subject, None).unwrap();
            assert_eq!(status, AuthStatus::SendFailure);
            assert_eq!(info.response_as::<Value>().unwrap()["status"], 401);
            assert!(subject.caller().is_none());
        }
    }

    #[test]
    fn test_valid_credentials_then_cleanup() {
        let module = initialized(None);
        let mut info = request_with(Some(basic("alice", "wonderland")));
        let mut subject = Subject::new();

        let status = module.validate_request(&mut info, &mut subject, None).unwrap();
        assert_eq!(status, AuthStatus::Success);
        assert_eq!(subject.caller(), Some(&Principal::caller("alice")));
        assert_eq!(subject.groups().collect::<Vec<_>>(), vec!["admins", "ops"]);

        info.set_response(json!({"status": 200}));
        assert_eq!(module.secure_response(&mut info, None).unwrap(), AuthStatus::SendSuccess);

        subject.add_principal(Principal::named("keep-me"));
        module.clean_subject(&mut info, &mut subject).unwrap();
        assert!(subject.caller().is_none());
        assert_eq!(subject.groups().count(), 0);
        assert!(subject.has_principal(&Principal::named("keep-me")));
    }

    #[test]
    fn test_uninitialized_module_errors() {
        let module = BasicCredentialModule::new();
        let mut info = request_with(None);
        let result = module.validate_request(&mut info, &mut Subject::new(), None);
        assert!(matches!(result, Err(AuthError::Module { .. })));
    }

    #[test]
    fn test_module_options_filter() {
        let mut properties = Properties::new();
        properties.insert("realm".to_string(), "api".to_string());
        properties.insert("users".to_string(), "alice=00".to_string());
        let options = module_options(&properties);
        assert_eq!(options.len(), 1);
        assert!(options.contains_key("realm"));
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Module Chain Protocol
//!
//! [`ChainClientAuthContext`] and [`ChainServerAuthContext`] run an ordered, immutable
//! list of initialized modules for one auth context.
//!
//! ## Secure / validate pass (fail-fast)
//!
//! ```text
//! status = Success
//! for module in chain:
//!     status = module(...)?            ← an AuthError aborts the pass
//!     Success | SendSuccess  → next module
//!     SendContinue | Failure | SendFailure → stop, this is the pass result
//! result = status of the last module run
//! ```
//!
//! ## Cleanup pass (fail-safe)
//!
//! Every module gets its cleanup call regardless of what earlier modules did. The first
//! cleanup error is returned once the pass completes; later ones are logged and dropped.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::auth_config::{ClientAuthContext, ServerAuthContext};
use crate::domain::error::AuthError;
use crate::domain::identity::Subject;
use crate::domain::message_info::{MessageInfo, MessageType};
use crate::domain::message_policy::MessagePolicy;
use crate::domain::module::{supports, AuthModule, ClientAuthModule, ServerAuthModule};
use crate::domain::status::AuthStatus;

/// Which pass of the exchange is running, for logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    SecureRequest,
    ValidateResponse,
    ValidateRequest,
    SecureResponse,
    CleanSubject,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SecureRequest => "secure_request",
            Self::ValidateResponse => "validate_response",
            Self::ValidateRequest => "validate_request",
            Self::SecureResponse => "secure_response",
            Self::CleanSubject => "clean_subject",
        };
        f.write_str(name)
    }
}

/// An initialized module together with the policies it was initialized with.
pub struct ModuleBinding<M: ?Sized> {
    module: Arc<M>,
    request_policy: Option<MessagePolicy>,
    response_policy: Option<MessagePolicy>,
}

impl<M: AuthModule + ?Sized> ModuleBinding<M> {
    pub fn new(
        module: Arc<M>,
        request_policy: Option<MessagePolicy>,
        response_policy: Option<MessagePolicy>,
    ) -> Self {
        Self {
            module,
            request_policy,
            response_policy,
        }
    }

    pub fn module(&self) -> &Arc<M> {
        &self.module
    }

    pub fn request_policy(&self) -> Option<&MessagePolicy> {
        self.request_policy.as_ref()
    }

    pub fn response_policy(&self) -> Option<&MessagePolicy> {
        self.response_policy.as_ref()
    }
}

/// Run one secure or validate pass. `message_type` is the type of the message the pass
/// consumes; modules that cannot process it fail the pass.
pub(crate) fn run_pass<M, F>(
    pass: Pass,
    bindings: &[ModuleBinding<M>],
    message_type: Option<MessageType>,
    mut invoke: F,
) -> Result<AuthStatus, AuthError>
where
    M: AuthModule + ?Sized,
    F: FnMut(&M) -> Result<AuthStatus, AuthError>,
{
    let mut status = AuthStatus::Success;

    for binding in bindings {
        let module = binding.module.as_ref();

        if !supports(&module.supported_message_types(), message_type) {
            let type_name = message_type.map(|t| t.name()).unwrap_or("<none>");
            warn!("Module '{}' cannot process {} in {}", module.name(), type_name, pass);
            return Err(AuthError::UnsupportedMessageType(format!(
                "{} (module '{}')",
                type_name,
                module.name()
            )));
        }

        status = invoke(module).map_err(|e| {
            warn!("Module '{}' raised during {}: {}", module.name(), pass, e);
            e
        })?;

        debug!("Module '{}' returned {} during {}", module.name(), status, pass);

        if !status.continues_chain() {
            debug!("Stopping {} at module '{}' with {}", pass, module.name(), status);
            return Ok(status);
        }
    }

    Ok(status)
}

/// Run the cleanup pass over every module, surfacing the first failure.
pub(crate) fn run_cleanup<M, F>(bindings: &[ModuleBinding<M>], mut clean: F) -> Result<(), AuthError>
where
    M: AuthModule + ?Sized,
    F: FnMut(&M) -> Result<(), AuthError>,
{
    let mut first_error: Option<AuthError> = None;

    for binding in bindings {
        let module = binding.module.as_ref();
        if let Err(e) = clean(module) {
            if first_error.is_none() {
                warn!("Cleanup failed in module '{}': {}", module.name(), e);
                first_error = Some(e);
            } else {
                warn!(
                    "Suppressing additional cleanup failure in module '{}': {}",
                    module.name(),
                    e
                );
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Client-side auth context over an ordered module chain.
pub struct ChainClientAuthContext {
    bindings: Vec<ModuleBinding<dyn ClientAuthModule>>,
}

impl ChainClientAuthContext {
    pub fn new(bindings: Vec<ModuleBinding<dyn ClientAuthModule>>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[ModuleBinding<dyn ClientAuthModule>] {
        &self.bindings
    }

    pub fn module_names(&self) -> Vec<String> {
        self.bindings
            .iter()
            .map(|b| b.module.name().to_string())
            .collect()
    }
}

impl ClientAuthContext for ChainClientAuthContext {
    fn secure_request(
        &self,
        info: &mut MessageInfo,
        client_subject: &mut Subject,
    ) -> Result<AuthStatus, AuthError> {
        let message_type = info.request().map(|m| m.message_type());
        run_pass(Pass::SecureRequest, &self.bindings, message_type, |module| {
            module.secure_request(info, client_subject)
        })
    }

    fn validate_response(
        &self,
        info: &mut MessageInfo,
        client_subject: &mut Subject,
        mut service_subject: Option<&mut Subject>,
    ) -> Result<AuthStatus, AuthError> {
        let message_type = info.response().map(|m| m.message_type());
        run_pass(Pass::ValidateResponse, &self.bindings, message_type, |module| {
            module.validate_response(info, client_subject, service_subject.as_deref_mut())
        })
    }

    fn clean_subject(&self, info: &mut MessageInfo, subject: &mut Subject) -> Result<(), AuthError> {
        debug!("Running {} across {} modules", Pass::CleanSubject, self.bindings.len());
        run_cleanup(&self.bindings, |module| module.clean_subject(info, subject))
    }
}

/// Server-side auth context over an ordered module chain.
pub struct ChainServerAuthContext {
    bindings: Vec<ModuleBinding<dyn ServerAuthModule>>,
}

impl ChainServerAuthContext {
    pub fn new(bindings: Vec<ModuleBinding<dyn ServerAuthModule>>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[ModuleBinding<dyn ServerAuthModule>] {
        &self.bindings
    }

    pub fn module_names(&self) -> Vec<String> {
        self.bindings
            .iter()
            .map(|b| b.module.name().to_string())
            .collect()
    }
}

impl ServerAuthContext for ChainServerAuthContext {
    fn validate_request(
        &self,
        info: &mut MessageInfo,
        client_subject: &mut Subject,
        mut service_subject: Option<&mut Subject>,
    ) -> Result<AuthStatus, AuthError> {
        let message_type = info.request().map(|m| m.message_type());
        run_pass(Pass::ValidateRequest, &self.bindings, message_type, |module| {
            module.validate_request(info, client_subject, service_subject.as_deref_mut())
        })
    }

    fn secure_response(
        &self,
        info: &mut MessageInfo,
        mut service_subject: Option<&mut Subject>,
    ) -> Result<AuthStatus, AuthError> {
        let message_type = info.response().map(|m| m.message_type());
        run_pass(Pass::SecureResponse, &self.bindings, message_type, |module| {
            module.secure_response(info, service_subject.as_deref_mut())
        })
    }

    fn clean_subject(&self, info: &mut MessageInfo, subject: &mut Subject) -> Result<(), AuthError> {
        debug!("Running {} across {} modules", Pass::CleanSubject, self.bindings.len());
        run_cleanup(&self.bindings, |module| module.clean_subject(info, subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::module::ModuleInit;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    /// Scripted module recording every call into a shared journal.
    struct Scripted {
        name: String,
        status: AuthStatus,
        fail_pass: bool,
        fail_cleanup: bool,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl Scripted {
        fn new(name: &str, status: AuthStatus, journal: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                status,
                fail_pass: false,
                fail_cleanup: false,
                journal: journal.clone(),
            }
        }

        fn record(&self, what: &str) {
            self.journal.lock().push(format!("{}:{}", self.name, what));
        }

        fn outcome(&self, what: &str) -> Result<AuthStatus, AuthError> {
            self.record(what);
            if self.fail_pass {
                return Err(AuthError::module(&self.name, "scripted failure"));
            }
            Ok(self.status)
        }

        fn cleanup(&self) -> Result<(), AuthError> {
            self.record("clean");
            if self.fail_cleanup {
                return Err(AuthError::module(&self.name, "cleanup failure"));
            }
            Ok(())
        }
    }

    impl AuthModule for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn supported_message_types(&self) -> Vec<MessageType> {
            vec![MessageType::of::<Value>()]
        }

        fn initialize(&mut self, _init: ModuleInit<'_>) -> Result<(), AuthError> {
            Ok(())
        }
    }

    impl ServerAuthModule for Scripted {
        fn validate_request(
            &self,
            _info: &mut MessageInfo,
            _client_subject: &mut Subject,
            _service_subject: Option<&mut Subject>,
        ) -> Result<AuthStatus, AuthError> {
            self.outcome("validate")
        }

        fn secure_response(
            &self,
            _info: &mut MessageInfo,
            _service_subject: Option<&mut Subject>,
        ) -> Result<AuthStatus, AuthError> {
            self.outcome("secure")
        }

        fn clean_subject(&self, _info: &mut MessageInfo, _subject: &mut Subject) -> Result<(), AuthError> {
            self.cleanup()
        }
    }

    impl ClientAuthModule for Scripted {
        fn secure_request(
            &self,
            _info: &mut MessageInfo,
            _client_subject: &mut Subject,
        ) -> Result<AuthStatus, AuthError> {
            self.outcome("secure")
        }

        fn validate_response(
            &self,
            _info: &mut MessageInfo,
            _client_subject: &mut Subject,
            _service_subject: Option<&mut Subject>,
        ) -> Result<AuthStatus, AuthError> {
            self.outcome("validate")
        }

        fn clean_subject(&self, _info: &mut MessageInfo, _subject: &mut Subject) -> Result<(), AuthError> {
            self.cleanup()
        }
    }

    fn server(modules: Vec<Scripted>) -> ChainServerAuthContext {
        ChainServerAuthContext::new(
            modules
                .into_iter()
                .map(|m| ModuleBinding::new(Arc::new(m) as Arc<dyn ServerAuthModule>, None, None))
                .collect(),
        )
    }

    fn client(modules: Vec<Scripted>) -> ChainClientAuthContext {
        ChainClientAuthContext::new(
            modules
                .into_iter()
                .map(|m| ModuleBinding::new(Arc::new(m) as Arc<dyn ClientAuthModule>, None, None))
                .collect(),
        )
    }

    #[test]
    fn test_send_failure_short_circuits_secure_pass() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = client(vec![
            Scripted::new("A", AuthStatus::Success, &journal),
            Scripted::new("B", AuthStatus::SendFailure, &journal),
            Scripted::new("C", AuthStatus::Success, &journal),
        ]);

        let mut info = MessageInfo::with_request(json!({}));
        let status = ctx.secure_request(&mut info, &mut Subject::new()).unwrap();

        assert_eq!(status, AuthStatus::SendFailure);
        assert_eq!(*journal.lock(), vec!["A:secure", "B:secure"]);
    }

    #[test]
    fn test_failure_short_circuits_first_module() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = server(vec![
            Scripted::new("A", AuthStatus::Failure, &journal),
            Scripted::new("B", AuthStatus::Success, &journal),
        ]);

        let mut info = MessageInfo::new();
        info.set_response(json!({"ok": true}));
        let status = ctx.secure_response(&mut info, None).unwrap();

        assert_eq!(status, AuthStatus::Failure);
        assert_eq!(*journal.lock(), vec!["A:secure"]);
    }

    #[test]
    fn test_completed_pass_returns_last_status() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = server(vec![
            Scripted::new("A", AuthStatus::Success, &journal),
            Scripted::new("B", AuthStatus::SendSuccess, &journal),
        ]);

        let mut info = MessageInfo::new();
        info.set_response(json!({}));
        let status = ctx.secure_response(&mut info, Some(&mut Subject::new())).unwrap();
        assert_eq!(status, AuthStatus::SendSuccess);
        assert_eq!(journal.lock().len(), 2);
    }

    #[test]
    fn test_send_continue_pauses_validate_pass() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = server(vec![
            Scripted::new("A", AuthStatus::SendContinue, &journal),
            Scripted::new("B", AuthStatus::Success, &journal),
        ]);

        let mut info = MessageInfo::with_request(json!({}));
        let status = ctx
            .validate_request(&mut info, &mut Subject::new(), None)
            .unwrap();
        assert_eq!(status, AuthStatus::SendContinue);
        assert_eq!(*journal.lock(), vec!["A:validate"]);
    }

    #[test]
    fn test_module_error_aborts_pass() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut failing = Scripted::new("A", AuthStatus::Success, &journal);
        failing.fail_pass = true;
        let ctx = server(vec![failing, Scripted::new("B", AuthStatus::Success, &journal)]);

        let mut info = MessageInfo::with_request(json!({}));
        let result = ctx.validate_request(&mut info, &mut Subject::new(), None);
        assert!(matches!(result, Err(AuthError::Module { .. })));
        assert_eq!(*journal.lock(), vec!["A:validate"]);
    }

    #[test]
    fn test_unsupported_message_type_fails_pass() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = server(vec![Scripted::new("A", AuthStatus::Success, &journal)]);

        let mut info = MessageInfo::with_request("plain text".to_string());
        let result = ctx.validate_request(&mut info, &mut Subject::new(), None);
        assert!(matches!(result, Err(AuthError::UnsupportedMessageType(_))));
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn test_cleanup_runs_every_module_and_keeps_first_error() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut a = Scripted::new("A", AuthStatus::Success, &journal);
        a.fail_cleanup = true;
        let b = Scripted::new("B", AuthStatus::Success, &journal);
        let mut c = Scripted::new("C", AuthStatus::Success, &journal);
        c.fail_cleanup = true;
        let ctx = server(vec![a, b, c]);

        let mut info = MessageInfo::new();
        let err = ctx
            .clean_subject(&mut info, &mut Subject::new())
            .unwrap_err();

        assert_eq!(*journal.lock(), vec!["A:clean", "B:clean", "C:clean"]);
        match err {
            AuthError::Module { module, .. } => assert_eq!(module, "A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cleanup_success() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let ctx = client(vec![
            Scripted::new("A", AuthStatus::Success, &journal),
            Scripted::new("B", AuthStatus::Success, &journal),
        ]);
        let mut info = MessageInfo::new();
        assert!(ctx.clean_subject(&mut info, &mut Subject::new()).is_ok());
        assert_eq!(ctx.module_names(), vec!["A", "B"]);
    }
}

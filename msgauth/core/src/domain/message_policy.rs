// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Message Policy Model
//!
//! A [`MessagePolicy`] says which parts of a message must be protected and how. It is an
//! ordered list of [`TargetPolicy`] entries (order = enforcement order) plus a
//! mandatory flag. Each `TargetPolicy` binds a [`ProtectionPolicy`] to an optional list
//! of [`Target`]s.
//!
//! ## Shape invariants
//!
//! - A target list, when present, is never empty. `None` means "the whole message".
//! - A message policy always holds at least one target policy. "No policy" is expressed by
//!   the absence of a `MessagePolicy` (`Option<MessagePolicy>`) at the module binding.
//!
//! Both lists are frozen into shared slices at construction, so the accessors cannot
//! observe an emptied list later on.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::domain::error::PolicyError;
use crate::domain::message_info::MessageInfo;

/// The authentication property that must hold for a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtectionPolicy {
    AuthenticateSender,
    AuthenticateRecipient,
    AuthenticateContent,
    /// Any other policy, identified by an opaque string.
    Custom(String),
}

impl ProtectionPolicy {
    pub const AUTHENTICATE_SENDER: &'static str = "#authenticateSender";
    pub const AUTHENTICATE_RECIPIENT: &'static str = "#authenticateRecipient";
    pub const AUTHENTICATE_CONTENT: &'static str = "#authenticateContent";

    pub fn id(&self) -> &str {
        match self {
            Self::AuthenticateSender => Self::AUTHENTICATE_SENDER,
            Self::AuthenticateRecipient => Self::AUTHENTICATE_RECIPIENT,
            Self::AuthenticateContent => Self::AUTHENTICATE_CONTENT,
            Self::Custom(id) => id,
        }
    }

    pub fn from_id(id: &str) -> Self {
        match id {
            Self::AUTHENTICATE_SENDER => Self::AuthenticateSender,
            Self::AUTHENTICATE_RECIPIENT => Self::AuthenticateRecipient,
            Self::AUTHENTICATE_CONTENT => Self::AuthenticateContent,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ProtectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// An addressable part of a message exchange.
pub trait Target: Send + Sync + fmt::Debug {
    fn get(&self, info: &MessageInfo) -> Option<Value>;

    fn put(&self, info: &mut MessageInfo, data: Value);

    fn remove(&self, info: &mut MessageInfo);
}

/// Which message of the exchange a target addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

/// Target over a JSON (`serde_json::Value`) message, or a part of it addressed by an
/// RFC 6901 pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonTarget {
    direction: Direction,
    pointer: Option<String>,
}

impl JsonTarget {
    pub fn whole(direction: Direction) -> Self {
        Self {
            direction,
            pointer: None,
        }
    }

    pub fn at(direction: Direction, pointer: impl Into<String>) -> Self {
        Self {
            direction,
            pointer: Some(pointer.into()),
        }
    }

    fn message<'a>(&self, info: &'a MessageInfo) -> Option<&'a Value> {
        match self.direction {
            Direction::Request => info.request_as::<Value>(),
            Direction::Response => info.response_as::<Value>(),
        }
    }

    fn message_mut<'a>(&self, info: &'a mut MessageInfo) -> Option<&'a mut Value> {
        match self.direction {
            Direction::Request => info.request_as_mut::<Value>(),
            Direction::Response => info.response_as_mut::<Value>(),
        }
    }

    fn is_present(&self, info: &MessageInfo) -> bool {
        match self.direction {
            Direction::Request => info.request().is_some(),
            Direction::Response => info.response().is_some(),
        }
    }

    fn replace(&self, info: &mut MessageInfo, data: Option<Value>) {
        let message = data.map(crate::domain::message_info::Message::new);
        match self.direction {
            Direction::Request => info.set_request_message(message),
            Direction::Response => info.set_response_message(message),
        }
    }
}

/// Split a pointer into its parent pointer and unescaped last token.
fn split_pointer(pointer: &str) -> Option<(&str, String)> {
    let idx = pointer.rfind('/')?;
    let token = pointer[idx + 1..].replace("~1", "/").replace("~0", "~");
    Some((&pointer[..idx], token))
}

impl Target for JsonTarget {
    fn get(&self, info: &MessageInfo) -> Option<Value> {
        let message = self.message(info)?;
        match &self.pointer {
            None => Some(message.clone()),
            Some(pointer) => message.pointer(pointer).cloned(),
        }
    }

    fn put(&self, info: &mut MessageInfo, data: Value) {
        let Some(pointer) = &self.pointer else {
            self.replace(info, Some(data));
            return;
        };
        let Some((parent, token)) = split_pointer(pointer) else {
            debug!("Ignoring put at malformed pointer '{}'", pointer);
            return;
        };
        if !self.is_present(info) {
            self.replace(info, Some(Value::Object(Default::default())));
        }
        let Some(message) = self.message_mut(info) else {
            debug!("Ignoring put at '{}': {:?} message is not JSON", pointer, self.direction);
            return;
        };
        let Some(parent) = message.pointer_mut(parent) else {
            debug!("Ignoring put at '{}': parent does not exist", pointer);
            return;
        };
        match parent {
            Value::Object(map) => {
                map.insert(token, data);
            }
            Value::Array(items) => match token.parse::<usize>() {
                Ok(index) if index < items.len() => items[index] = data,
                _ if token == "-" => items.push(data),
                _ => debug!("Ignoring put at '{}': no such array index", pointer),
            },
            _ => debug!("Ignoring put at '{}': parent is not a container", pointer),
        }
    }

    fn remove(&self, info: &mut MessageInfo) {
        let Some(pointer) = &self.pointer else {
            self.replace(info, None);
            return;
        };
        let Some((parent, token)) = split_pointer(pointer) else {
            debug!("Ignoring remove at malformed pointer '{}'", pointer);
            return;
        };
        let Some(parent) = self.message_mut(info).and_then(|m| m.pointer_mut(parent)) else {
            debug!("Ignoring remove at '{}': no JSON parent", pointer);
            return;
        };
        match parent {
            Value::Object(map) => {
                map.remove(&token);
            }
            Value::Array(items) => match token.parse::<usize>() {
                Ok(index) if index < items.len() => {
                    items.remove(index);
                }
                _ => debug!("Ignoring remove at '{}': no such array index", pointer),
            },
            _ => debug!("Ignoring remove at '{}': parent is not a container", pointer),
        }
    }
}

/// A protection policy applied to zero or more targets.
#[derive(Debug, Clone)]
pub struct TargetPolicy {
    targets: Option<Arc<[Arc<dyn Target>]>>,
    protection_policy: ProtectionPolicy,
}

impl TargetPolicy {
    /// `targets = None` applies the policy to the whole message; `Some(vec![])` is a
    /// configuration error.
    pub fn new(
        targets: Option<Vec<Arc<dyn Target>>>,
        protection_policy: ProtectionPolicy,
    ) -> Result<Self, PolicyError> {
        if matches!(&targets, Some(t) if t.is_empty()) {
            return Err(PolicyError::EmptyTargets);
        }
        Ok(Self {
            targets: targets.map(Arc::from),
            protection_policy,
        })
    }

    pub fn whole_message(protection_policy: ProtectionPolicy) -> Self {
        Self {
            targets: None,
            protection_policy,
        }
    }

    pub fn targets(&self) -> Option<&[Arc<dyn Target>]> {
        self.targets.as_deref()
    }

    pub fn protection_policy(&self) -> &ProtectionPolicy {
        &self.protection_policy
    }
}

/// Ordered target policies plus the mandatory flag.
#[derive(Debug, Clone)]
pub struct MessagePolicy {
    target_policies: Arc<[TargetPolicy]>,
    mandatory: bool,
}

impl MessagePolicy {
    pub fn new(target_policies: Vec<TargetPolicy>, mandatory: bool) -> Result<Self, PolicyError> {
        if target_policies.is_empty() {
            return Err(PolicyError::EmptyTargetPolicies);
        }
        Ok(Self {
            target_policies: Arc::from(target_policies),
            mandatory,
        })
    }

    /// Single whole-message policy, the common case for sender authentication.
    pub fn single(protection_policy: ProtectionPolicy, mandatory: bool) -> Self {
        Self {
            target_policies: Arc::from(vec![TargetPolicy::whole_message(protection_policy)]),
            mandatory,
        }
    }

    pub fn target_policies(&self) -> &[TargetPolicy] {
        &self.target_policies
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn requires(&self, protection_policy: &ProtectionPolicy) -> bool {
        self.target_policies
            .iter()
            .any(|tp| tp.protection_policy() == protection_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_target_list_is_rejected() {
        let err = TargetPolicy::new(Some(vec![]), ProtectionPolicy::AuthenticateContent)
            .unwrap_err();
        assert_eq!(err, PolicyError::EmptyTargets);
    }

    #[test]
    fn test_absent_target_list_means_whole_message() {
        let policy = TargetPolicy::new(None, ProtectionPolicy::AuthenticateSender).unwrap();
        assert!(policy.targets().is_none());
        // Repeated access stays None rather than failing.
        assert!(policy.targets().is_none());
        assert_eq!(policy.protection_policy().id(), "#authenticateSender");
    }

    #[test]
    fn test_empty_target_policy_list_is_rejected() {
        let err = MessagePolicy::new(vec![], true).unwrap_err();
        assert_eq!(err, PolicyError::EmptyTargetPolicies);
    }

    #[test]
    fn test_target_policy_order_is_preserved() {
        let policy = MessagePolicy::new(
            vec![
                TargetPolicy::whole_message(ProtectionPolicy::AuthenticateContent),
                TargetPolicy::whole_message(ProtectionPolicy::AuthenticateSender),
            ],
            false,
        )
        .unwrap();
        let ids: Vec<_> = policy
            .target_policies()
            .iter()
            .map(|tp| tp.protection_policy().id().to_string())
            .collect();
        assert_eq!(ids, vec!["#authenticateContent", "#authenticateSender"]);
        assert!(!policy.is_mandatory());
        assert!(policy.requires(&ProtectionPolicy::AuthenticateSender));
        assert!(!policy.requires(&ProtectionPolicy::AuthenticateRecipient));
    }

    #[test]
    fn test_protection_policy_ids_roundtrip() {
        assert_eq!(
            ProtectionPolicy::from_id("#authenticateRecipient"),
            ProtectionPolicy::AuthenticateRecipient
        );
        assert_eq!(
            ProtectionPolicy::from_id("urn:custom"),
            ProtectionPolicy::Custom("urn:custom".to_string())
        );
    }

    #[test]
    fn test_json_target_get_put_remove() {
        let mut info = MessageInfo::with_request(json!({"header": {"token": "t1"}, "body": [1, 2]}));
        let token = JsonTarget::at(Direction::Request, "/header/token");

        assert_eq!(token.get(&info), Some(json!("t1")));
        token.put(&mut info, json!("t2"));
        assert_eq!(token.get(&info), Some(json!("t2")));
        token.remove(&mut info);
        assert_eq!(token.get(&info), None);

        let first = JsonTarget::at(Direction::Request, "/body/0");
        first.remove(&mut info);
        assert_eq!(
            JsonTarget::whole(Direction::Request).get(&info),
            Some(json!({"header": {}, "body": [2]}))
        );
    }

    #[test]
    fn test_json_target_whole_response() {
        let mut info = MessageInfo::new();
        let whole = JsonTarget::whole(Direction::Response);
        assert_eq!(whole.get(&info), None);

        whole.put(&mut info, json!({"status": 200}));
        assert_eq!(whole.get(&info), Some(json!({"status": 200})));

        JsonTarget::at(Direction::Response, "/a~1b").put(&mut info, json!(true));
        assert_eq!(info.response_as::<Value>().unwrap()["a/b"], json!(true));

        whole.remove(&mut info);
        assert!(info.response().is_none());
    }

    #[test]
    fn test_json_target_leaves_foreign_messages_alone() {
        let mut info = MessageInfo::with_request("opaque-soap-envelope".to_string());
        let signature = JsonTarget::at(Direction::Request, "/sig");

        signature.put(&mut info, json!("abc"));
        assert_eq!(
            info.request_as::<String>().map(String::as_str),
            Some("opaque-soap-envelope")
        );
        assert_eq!(signature.get(&info), None);

        signature.remove(&mut info);
        assert!(info.request_as::<String>().is_some());
    }

    #[test]
    fn test_json_target_put_without_parent_is_a_no_op() {
        let mut info = MessageInfo::with_request(json!({"header": {}}));
        JsonTarget::at(Direction::Request, "/missing/token").put(&mut info, json!(1));
        JsonTarget::at(Direction::Request, "no-leading-slash").put(&mut info, json!(2));
        JsonTarget::at(Direction::Request, "/header/0").remove(&mut info);
        assert_eq!(
            JsonTarget::whole(Direction::Request).get(&info),
            Some(json!({"header": {}}))
        );
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Message Exchange Container
//!
//! A [`MessageInfo`] carries the request and response of one message exchange plus a
//! scratch map shared by every call in that exchange's sequence
//! (secure → validate → cleanup). The runtime creates one per exchange and drops it when
//! the exchange ends; it is never shared between exchanges, which ownership enforces.
//!
//! Messages are type-erased ([`Message`]) so modules can declare which concrete message
//! types they understand via [`MessageType`].

use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Scratch state for one call sequence.
pub type Scratch = HashMap<String, Value>;

/// Runtime identity of a concrete message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType {
    name: &'static str,
    id: TypeId,
}

impl MessageType {
    pub fn of<T: Any>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A request or response value of any `Send + Sync` type.
pub struct Message {
    message_type: MessageType,
    value: Box<dyn Any + Send + Sync>,
}

impl Message {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            message_type: MessageType::of::<T>(),
            value: Box::new(value),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn is<T: Any>(&self) -> bool {
        self.message_type.id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Unwrap the concrete value, handing the message back when the type does not match.
    pub fn into_inner<T: Any>(self) -> Result<T, Self> {
        let message_type = self.message_type;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                message_type,
                value,
            }),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.message_type.name)
            .finish_non_exhaustive()
    }
}

/// Request, response and scratch map of one message exchange.
#[derive(Debug, Default)]
pub struct MessageInfo {
    request: Option<Message>,
    response: Option<Message>,
    map: Option<Scratch>,
}

impl MessageInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            request: Some(Message::new(value)),
            ..Self::default()
        }
    }

    pub fn request(&self) -> Option<&Message> {
        self.request.as_ref()
    }

    pub fn request_as<T: Any>(&self) -> Option<&T> {
        self.request.as_ref().and_then(Message::downcast_ref)
    }

    pub fn request_as_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.request.as_mut().and_then(Message::downcast_mut)
    }

    pub fn set_request<T: Any + Send + Sync>(&mut self, value: T) {
        self.request = Some(Message::new(value));
    }

    pub fn set_request_message(&mut self, message: Option<Message>) {
        self.request = message;
    }

    pub fn take_request(&mut self) -> Option<Message> {
        self.request.take()
    }

    pub fn response(&self) -> Option<&Message> {
        self.response.as_ref()
    }

    pub fn response_as<T: Any>(&self) -> Option<&T> {
        self.response.as_ref().and_then(Message::downcast_ref)
    }

    pub fn response_as_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.response.as_mut().and_then(Message::downcast_mut)
    }

    pub fn set_response<T: Any + Send + Sync>(&mut self, value: T) {
        self.response = Some(Message::new(value));
    }

    pub fn set_response_message(&mut self, message: Option<Message>) {
        self.response = message;
    }

    pub fn take_response(&mut self) -> Option<Message> {
        self.response.take()
    }

    /// The scratch map, created on first access and kept for the rest of the exchange.
    pub fn map(&mut self) -> &mut Scratch {
        self.map.get_or_insert_with(HashMap::new)
    }

    /// The scratch map if any call has touched it yet.
    pub fn peek_map(&self) -> Option<&Scratch> {
        self.map.as_ref()
    }
}

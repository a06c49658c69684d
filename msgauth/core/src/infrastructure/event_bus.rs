// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Registry Event Bus - Pub/Sub for Registration Changes
//
// In-memory event streaming over tokio broadcast channels. Observers (audit logs,
// dashboards, config caches) subscribe to learn about registrations coming and going.
// Events are lost when nobody is subscribed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::registration::{RegistrationId, RegistrationKey};

/// A change to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    Registered {
        id: RegistrationId,
        key: RegistrationKey,
        persistent: bool,
        at: DateTime<Utc>,
    },
    /// Provider and description of an existing registration were swapped in place.
    Replaced {
        id: RegistrationId,
        key: RegistrationKey,
        persistent: bool,
        listeners_notified: usize,
        at: DateTime<Utc>,
    },
    Removed {
        id: RegistrationId,
        key: RegistrationKey,
        listeners_notified: usize,
        at: DateTime<Utc>,
    },
}

impl RegistryEvent {
    pub fn id(&self) -> &RegistrationId {
        match self {
            Self::Registered { id, .. } | Self::Replaced { id, .. } | Self::Removed { id, .. } => id,
        }
    }

    pub fn key(&self) -> &RegistrationKey {
        match self {
            Self::Registered { key, .. } | Self::Replaced { key, .. } | Self::Removed { key, .. } => key,
        }
    }
}

/// Event bus for publishing and subscribing to registry events
#[derive(Clone)]
pub struct RegistryEventBus {
    sender: Arc<broadcast::Sender<RegistryEvent>>,
}

impl RegistryEventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (256)
    pub fn with_default_capacity() -> Self {
        Self::new(256)
    }

    pub fn publish(&self, event: RegistryEvent) {
        debug!("Publishing registry event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to registry event");
        }
    }

    /// Subscribe to all registry events
    pub fn subscribe(&self) -> RegistryEventReceiver {
        RegistryEventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to events touching one (layer, appContext) pair
    pub fn subscribe_key(&self, key: RegistrationKey) -> KeyEventReceiver {
        KeyEventReceiver {
            receiver: self.sender.subscribe(),
            key,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RegistryEventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Receiver for all registry events
pub struct RegistryEventReceiver {
    receiver: broadcast::Receiver<RegistryEvent>,
}

impl RegistryEventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<RegistryEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<RegistryEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Registry event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one registration key
pub struct KeyEventReceiver {
    receiver: broadcast::Receiver<RegistryEvent>,
    key: RegistrationKey,
}

impl KeyEventReceiver {
    pub async fn recv(&mut self) -> Result<RegistryEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.key() == &self.key {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Registry event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

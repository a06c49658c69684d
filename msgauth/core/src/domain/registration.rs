// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Provider Registration Model
//!
//! A registration binds a provider to a (layer, appContext) pair, either of which may be
//! absent (wildcard). At most one registration is active per exact pair.
//!
//! ## Lookup precedence
//!
//! For a query `(L, A)` the registry tries, most specific first:
//!
//! 1. `(L, A)`
//! 2. `(None, A)`
//! 3. `(L, None)`
//! 4. `(None, None)`
//!
//! The first pair holding a registration wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// String key/value settings handed to providers and modules.
pub type Properties = BTreeMap<String, String>;

/// Process-lifetime unique registration identifier (`R1`, `R2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrationId(String);

impl RegistrationId {
    pub fn from_sequence(n: u64) -> Self {
        Self(format!("R{}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Counter value of an `R<n>` id.
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix('R')?.parse().ok()
    }
}

impl From<&str> for RegistrationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for RegistrationId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Exact (layer, appContext) pair a registration is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrationKey {
    pub layer: Option<String>,
    pub app_context: Option<String>,
}

impl RegistrationKey {
    pub fn new(layer: Option<&str>, app_context: Option<&str>) -> Self {
        Self {
            layer: layer.map(str::to_string),
            app_context: app_context.map(str::to_string),
        }
    }

    /// Candidate keys for a lookup, most specific first, without repeats.
    pub fn lookup_order(layer: Option<&str>, app_context: Option<&str>) -> Vec<Self> {
        let candidates = [
            Self::new(layer, app_context),
            Self::new(None, app_context),
            Self::new(layer, None),
            Self::new(None, None),
        ];
        let mut order: Vec<Self> = Vec::with_capacity(candidates.len());
        for key in candidates {
            if !order.contains(&key) {
                order.push(key);
            }
        }
        order
    }

    /// Filter match used when detaching listeners: an absent filter matches anything.
    pub fn matches_filter(&self, layer: Option<&str>, app_context: Option<&str>) -> bool {
        let layer_ok = layer.map_or(true, |l| self.layer.as_deref() == Some(l));
        let app_ok = app_context.map_or(true, |a| self.app_context.as_deref() == Some(a));
        layer_ok && app_ok
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {})",
            self.layer.as_deref().unwrap_or("*"),
            self.app_context.as_deref().unwrap_or("*")
        )
    }
}

/// Where a registered provider came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSource {
    /// Declared by class name and properties; resolved through a provider factory and
    /// persisted to the declarative store.
    Declared {
        class_name: String,
        properties: Properties,
    },
    /// A live provider handed over directly (typically self-registration); never persisted.
    Instance,
}

impl ProviderSource {
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Declared { .. })
    }
}

/// Public view of one registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationContext {
    pub layer: Option<String>,
    pub app_context: Option<String>,
    pub description: Option<String>,
    pub persistent: bool,
}

/// Receives a one-shot notice that the registration it was attached to changed or went
/// away. After delivery the listener is detached from that registration.
pub trait RegistrationListener: Send + Sync {
    fn notify(&self, layer: Option<&str>, app_context: Option<&str>);
}

impl<F> RegistrationListener for F
where
    F: Fn(Option<&str>, Option<&str>) + Send + Sync,
{
    fn notify(&self, layer: Option<&str>, app_context: Option<&str>) {
        self(layer, app_context)
    }
}

/// Identity comparison of shared handles (data pointer only, ignoring vtables).
pub(crate) fn same_handle<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

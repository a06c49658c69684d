// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Auth Config Provider Registry
//!
//! Process-wide directory of provider registrations keyed by (layer, appContext).
//!
//! ## Storage
//!
//! ```text
//! entries:   DashMap<RegistrationKey, RegistrationEntry>   one slot per exact pair
//! ids:       DashMap<RegistrationId, RegistrationKey>      reverse index
//! key_locks: DashMap<RegistrationKey, Arc<Mutex<()>>>      one writer per pair
//! pending:   Mutex<Vec<PendingListener>>                   listeners of unanswered lookups
//! ```
//!
//! Each slot is swapped as a whole under its shard lock, so lookups never observe a
//! half-applied registration. Writers to the same pair are serialized by that pair's
//! key lock, which also covers the store write, so the store and the slot agree.
//! Writers to different pairs never wait on each other.
//!
//! ## Listeners
//!
//! A listener handed to [`AuthConfigRegistry::get_provider`] is attached to the
//! registration that answered the lookup. When that registration is replaced or removed,
//! every attached listener is notified once and detached.
//!
//! A lookup that finds nothing parks its listener against the queried pair. The first
//! registration created that would answer that lookup notifies it once with the queried
//! pair and consumes it.
//!
//! Notifications are collected while locks are held and delivered after every lock is
//! released, so a listener may call back into the registry, including mutating methods.
//!
//! ## Declared vs instance registrations
//!
//! `register` resolves a declared class through the [`ProviderFactory`] first, persists
//! the declaration to the attached [`RegistrationStore`] second, and only then swaps the
//! slot. `register_instance` never touches the store except to drop the declaration of a
//! persistent registration it replaces.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{const_rwlock, Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::auth_config::AuthConfigProvider;
use crate::domain::error::RegistryError;
use crate::domain::registration::{
    same_handle, Properties, ProviderSource, RegistrationContext, RegistrationId,
    RegistrationKey, RegistrationListener,
};
use crate::domain::registry_manifest::DeclaredRegistration;
use crate::domain::repository::{ProviderFactory, RegistrationStore};
use crate::infrastructure::event_bus::{RegistryEvent, RegistryEventBus};

struct RegistrationEntry {
    id: RegistrationId,
    source: ProviderSource,
    provider: Arc<dyn AuthConfigProvider>,
    description: Option<String>,
    listeners: Vec<Arc<dyn RegistrationListener>>,
}

/// A listener whose lookup found nothing, parked against the pair it asked for.
struct PendingListener {
    query: RegistrationKey,
    listener: Arc<dyn RegistrationListener>,
}

impl PendingListener {
    fn answered_by(&self, key: &RegistrationKey) -> bool {
        RegistrationKey::lookup_order(self.query.layer.as_deref(), self.query.app_context.as_deref())
            .contains(key)
    }
}

/// Outcome of swapping one slot.
struct Applied {
    id: RegistrationId,
    replaced: bool,
    previous_persistent: bool,
    listeners: Vec<Arc<dyn RegistrationListener>>,
}

/// Listeners detached during a write, delivered once every lock is released.
#[derive(Default)]
#[must_use = "collected notifications must be delivered"]
struct Notices {
    batches: Vec<(RegistrationKey, Vec<Arc<dyn RegistrationListener>>)>,
}

impl Notices {
    fn push(&mut self, key: RegistrationKey, listeners: Vec<Arc<dyn RegistrationListener>>) -> usize {
        let count = listeners.len();
        if count > 0 {
            self.batches.push((key, listeners));
        }
        count
    }

    fn deliver(self) {
        for (key, listeners) in self.batches {
            for listener in &listeners {
                listener.notify(key.layer.as_deref(), key.app_context.as_deref());
            }
            debug!("Notified {} listeners of change at {}", listeners.len(), key);
        }
    }
}

pub struct AuthConfigRegistry {
    entries: DashMap<RegistrationKey, RegistrationEntry>,
    ids: DashMap<RegistrationId, RegistrationKey>,
    next_id: AtomicU64,
    factory: Arc<dyn ProviderFactory>,
    store: Option<Arc<dyn RegistrationStore>>,
    events: RegistryEventBus,
    key_locks: DashMap<RegistrationKey, Arc<Mutex<()>>>,
    pending: Mutex<Vec<PendingListener>>,
    /// One refresh at a time; other writers only wait on the pairs a refresh touches.
    refresh_lock: Mutex<()>,
}

impl AuthConfigRegistry {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            entries: DashMap::new(),
            ids: DashMap::new(),
            next_id: AtomicU64::new(1),
            factory,
            store: None,
            events: RegistryEventBus::default(),
            key_locks: DashMap::new(),
            pending: Mutex::new(Vec::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Attach the declarative backing source. Call [`Self::refresh`] to load it.
    pub fn with_store(mut self, store: Arc<dyn RegistrationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_event_bus(mut self, events: RegistryEventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &RegistryEventBus {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn allocate_id(&self) -> RegistrationId {
        RegistrationId::from_sequence(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn key_lock(&self, key: &RegistrationKey) -> Arc<Mutex<()>> {
        self.key_locks.entry(key.clone()).or_default().clone()
    }

    /// Register a declared provider class for (layer, appContext).
    ///
    /// Creates the registration or replaces the provider of the existing one in place,
    /// keeping its id.
    pub fn register(
        &self,
        class_name: &str,
        properties: Properties,
        layer: Option<&str>,
        app_context: Option<&str>,
        description: Option<&str>,
    ) -> Result<RegistrationId, RegistryError> {
        let provider = self.factory.create(class_name, &properties)?;
        let key = RegistrationKey::new(layer, app_context);
        let declaration = DeclaredRegistration {
            class_name: class_name.to_string(),
            properties: properties.clone(),
            layer: key.layer.clone(),
            app_context: key.app_context.clone(),
            description: description.map(str::to_string),
        };

        let mut notices = Notices::default();
        let id = {
            let lock = self.key_lock(&key);
            let _guard = lock.lock();
            if let Some(store) = &self.store {
                store.upsert(&declaration)?;
            }
            let source = ProviderSource::Declared {
                class_name: class_name.to_string(),
                properties,
            };
            self.apply(key, source, provider, declaration.description, &mut notices)
        };
        notices.deliver();
        Ok(id)
    }

    /// Register a live provider for (layer, appContext). Never persisted.
    pub fn register_instance(
        &self,
        provider: Arc<dyn AuthConfigProvider>,
        layer: Option<&str>,
        app_context: Option<&str>,
        description: Option<&str>,
    ) -> RegistrationId {
        let key = RegistrationKey::new(layer, app_context);
        let mut notices = Notices::default();
        let id = {
            let lock = self.key_lock(&key);
            let _guard = lock.lock();
            self.apply(
                key,
                ProviderSource::Instance,
                provider,
                description.map(str::to_string),
                &mut notices,
            )
        };
        notices.deliver();
        id
    }

    /// Swap the slot for `key`. Caller holds the key lock and delivers `notices`.
    fn apply(
        &self,
        key: RegistrationKey,
        source: ProviderSource,
        provider: Arc<dyn AuthConfigProvider>,
        description: Option<String>,
        notices: &mut Notices,
    ) -> RegistrationId {
        let persistent = source.is_persistent();

        let applied = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let previous_persistent = entry.source.is_persistent();
                entry.source = source;
                entry.provider = provider;
                entry.description = description;
                Applied {
                    id: entry.id.clone(),
                    replaced: true,
                    previous_persistent,
                    listeners: std::mem::take(&mut entry.listeners),
                }
            }
            Entry::Vacant(vacant) => {
                let id = self.allocate_id();
                vacant.insert(RegistrationEntry {
                    id: id.clone(),
                    source,
                    provider,
                    description,
                    listeners: Vec::new(),
                });
                Applied {
                    id,
                    replaced: false,
                    previous_persistent: false,
                    listeners: Vec::new(),
                }
            }
        };

        if !applied.replaced {
            self.ids.insert(applied.id.clone(), key.clone());
            self.release_pending(&key, notices);
            info!("Registered {} for {} (persistent: {})", applied.id, key, persistent);
            self.events.publish(RegistryEvent::Registered {
                id: applied.id.clone(),
                key,
                persistent,
                at: Utc::now(),
            });
            return applied.id;
        }

        if applied.previous_persistent && !persistent {
            self.forget_declaration(&key);
        }

        info!(
            "Replaced provider of {} for {} (persistent: {})",
            applied.id, key, persistent
        );
        let notified = notices.push(key.clone(), applied.listeners);
        self.events.publish(RegistryEvent::Replaced {
            id: applied.id.clone(),
            key,
            persistent,
            listeners_notified: notified,
            at: Utc::now(),
        });
        applied.id
    }

    /// Consume the parked listeners whose lookup a new slot at `key` now answers.
    fn release_pending(&self, key: &RegistrationKey, notices: &mut Notices) {
        let released: Vec<PendingListener> = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return;
            }
            let (released, kept) = std::mem::take(&mut *pending)
                .into_iter()
                .partition(|p| p.answered_by(key));
            *pending = kept;
            released
        };
        for parked in released {
            debug!("Registration at {} answers parked lookup {}", key, parked.query);
            notices.push(parked.query, vec![parked.listener]);
        }
    }

    /// Drop a declaration from the store; failures are logged, not raised.
    fn forget_declaration(&self, key: &RegistrationKey) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(key) {
                warn!("Failed to remove declaration for {} from store: {}", key, e);
            }
        }
    }

    /// Remove the registration `id`. Attached listeners are notified once and detached.
    ///
    /// Returns `false` when `id` is not active.
    pub fn unregister(&self, id: &RegistrationId) -> bool {
        let Some(key) = self.ids.get(id).map(|k| k.value().clone()) else {
            debug!("Unregister of inactive id {}", id);
            return false;
        };

        let mut notices = Notices::default();
        let removed = {
            let lock = self.key_lock(&key);
            let _guard = lock.lock();
            match self.remove_entry(id, &key, &mut notices) {
                Some(source) => {
                    if source.is_persistent() {
                        self.forget_declaration(&key);
                    }
                    true
                }
                None => false,
            }
        };
        notices.deliver();

        if !removed {
            debug!("Unregister of inactive id {}", id);
        }
        removed
    }

    /// Remove the slot at `key` if it still holds `id`. Caller holds the key lock.
    fn remove_entry(
        &self,
        id: &RegistrationId,
        key: &RegistrationKey,
        notices: &mut Notices,
    ) -> Option<ProviderSource> {
        let (key, entry) = self.entries.remove_if(key, |_, e| &e.id == id)?;
        self.ids.remove(id);

        info!("Removed {} for {}", id, key);
        let notified = notices.push(key.clone(), entry.listeners);
        self.events.publish(RegistryEvent::Removed {
            id: id.clone(),
            key,
            listeners_notified: notified,
            at: Utc::now(),
        });

        Some(entry.source)
    }

    fn find(
        &self,
        key: &RegistrationKey,
        listener: Option<&Arc<dyn RegistrationListener>>,
    ) -> Option<(RegistrationId, Arc<dyn AuthConfigProvider>)> {
        match listener {
            Some(listener) => self.entries.get_mut(key).map(|mut entry| {
                if !entry.listeners.iter().any(|l| same_handle(l, listener)) {
                    entry.listeners.push(listener.clone());
                }
                (entry.id.clone(), entry.provider.clone())
            }),
            None => self
                .entries
                .get(key)
                .map(|entry| (entry.id.clone(), entry.provider.clone())),
        }
    }

    /// Resolve the provider for (layer, appContext) by precedence:
    /// exact pair, then `(None, A)`, then `(L, None)`, then `(None, None)`.
    ///
    /// A `listener` is attached to the registration that answered. If nothing answered
    /// it is parked against the queried pair and notified once when a registration that
    /// would answer the same lookup is created.
    pub fn get_provider(
        &self,
        layer: Option<&str>,
        app_context: Option<&str>,
        listener: Option<Arc<dyn RegistrationListener>>,
    ) -> Option<Arc<dyn AuthConfigProvider>> {
        let order = RegistrationKey::lookup_order(layer, app_context);
        for key in &order {
            if let Some((id, provider)) = self.find(key, listener.as_ref()) {
                debug!(
                    "Lookup ({}, {}) resolved to {} at {}",
                    layer.unwrap_or("*"),
                    app_context.unwrap_or("*"),
                    id,
                    key
                );
                return Some(provider);
            }
        }

        debug!(
            "Lookup ({}, {}) found no registration",
            layer.unwrap_or("*"),
            app_context.unwrap_or("*")
        );
        if let Some(listener) = listener {
            self.park(RegistrationKey::new(layer, app_context), listener, &order);
        }
        None
    }

    fn park(
        &self,
        query: RegistrationKey,
        listener: Arc<dyn RegistrationListener>,
        order: &[RegistrationKey],
    ) {
        {
            let mut pending = self.pending.lock();
            if !pending
                .iter()
                .any(|p| p.query == query && same_handle(&p.listener, &listener))
            {
                pending.push(PendingListener {
                    query: query.clone(),
                    listener: listener.clone(),
                });
            }
        }

        // A registration created between the miss and the park has already swept
        // `pending`; deliver for it here unless that sweep took this listener.
        if order.iter().any(|key| self.entries.contains_key(key)) {
            let unparked = {
                let mut pending = self.pending.lock();
                let before = pending.len();
                pending.retain(|p| !(p.query == query && same_handle(&p.listener, &listener)));
                pending.len() != before
            };
            if unparked {
                let mut notices = Notices::default();
                notices.push(query, vec![listener]);
                notices.deliver();
            }
        }
    }

    /// Detach `listener` from every registration whose pair matches the filters (an
    /// absent filter matches anything). Returns the ids it was detached from.
    ///
    /// Parked lookups whose queried pair matches the filters are dropped as well.
    pub fn detach_listener(
        &self,
        listener: &Arc<dyn RegistrationListener>,
        layer: Option<&str>,
        app_context: Option<&str>,
    ) -> Vec<RegistrationId> {
        let mut detached = Vec::new();
        for mut entry in self.entries.iter_mut() {
            if !entry.key().matches_filter(layer, app_context) {
                continue;
            }
            let before = entry.listeners.len();
            entry.listeners.retain(|l| !same_handle(l, listener));
            if entry.listeners.len() != before {
                detached.push(entry.id.clone());
            }
        }
        self.pending.lock().retain(|p| {
            !(p.query.matches_filter(layer, app_context) && same_handle(&p.listener, listener))
        });
        sort_ids(&mut detached);
        detached
    }

    /// All active ids, or only those bound to `provider`.
    pub fn registration_ids(
        &self,
        provider: Option<&Arc<dyn AuthConfigProvider>>,
    ) -> Vec<RegistrationId> {
        let mut ids: Vec<RegistrationId> = self
            .entries
            .iter()
            .filter(|entry| provider.map_or(true, |p| same_handle(&entry.provider, p)))
            .map(|entry| entry.id.clone())
            .collect();
        sort_ids(&mut ids);
        ids
    }

    pub fn registration_context(&self, id: &RegistrationId) -> Option<RegistrationContext> {
        let key = self.ids.get(id).map(|k| k.value().clone())?;
        let entry = self.entries.get(&key)?;
        if &entry.id != id {
            return None;
        }
        Some(RegistrationContext {
            layer: key.layer.clone(),
            app_context: key.app_context.clone(),
            description: entry.description.clone(),
            persistent: entry.source.is_persistent(),
        })
    }

    /// Declared class name of a persistent registration.
    pub fn declared_class(&self, id: &RegistrationId) -> Option<String> {
        let key = self.ids.get(id).map(|k| k.value().clone())?;
        let entry = self.entries.get(&key)?;
        match &entry.source {
            ProviderSource::Declared { class_name, .. } if &entry.id == id => {
                Some(class_name.clone())
            }
            _ => None,
        }
    }

    /// Reconcile with the attached store.
    ///
    /// - new declarations are registered
    /// - declarations whose class or properties changed replace their entry in place
    ///   (same id, listeners notified)
    /// - unchanged declarations keep their entry untouched (a changed description is
    ///   updated silently)
    /// - persistent entries no longer declared are removed (listeners notified)
    /// - instance registrations are left alone, including against a declaration for
    ///   the same pair
    ///
    /// A declaration whose provider cannot be constructed is skipped with a warning.
    /// Each pair is reconciled under its own key lock against the declarations as
    /// loaded when the refresh started.
    pub fn refresh(&self) -> Result<(), RegistryError> {
        let Some(store) = &self.store else {
            debug!("Refresh without a registration store is a no-op");
            return Ok(());
        };

        let mut notices = Notices::default();
        {
            let _refresh = self.refresh_lock.lock();
            let declarations = store.load()?;
            info!("Refreshing registry from {} declarations", declarations.len());

            let mut declared_keys = HashSet::new();
            for declaration in declarations {
                let key = declaration.key();
                declared_keys.insert(key.clone());
                let lock = self.key_lock(&key);
                let _guard = lock.lock();
                self.reconcile(key, declaration, &mut notices);
            }

            let stale: Vec<(RegistrationId, RegistrationKey)> = self
                .entries
                .iter()
                .filter(|entry| entry.source.is_persistent() && !declared_keys.contains(entry.key()))
                .map(|entry| (entry.id.clone(), entry.key().clone()))
                .collect();
            for (id, key) in stale {
                let lock = self.key_lock(&key);
                let _guard = lock.lock();
                let still_declared = self
                    .entries
                    .get(&key)
                    .is_some_and(|e| e.id == id && e.source.is_persistent());
                if still_declared {
                    self.remove_entry(&id, &key, &mut notices);
                }
            }
        }
        notices.deliver();
        Ok(())
    }

    /// Bring the slot at `key` in line with `declaration`. Caller holds the key lock.
    fn reconcile(
        &self,
        key: RegistrationKey,
        declaration: DeclaredRegistration,
        notices: &mut Notices,
    ) {
        if let Some(mut entry) = self.entries.get_mut(&key) {
            match &entry.source {
                ProviderSource::Instance => {
                    debug!("Declaration for {} shadowed by an instance registration", key);
                    return;
                }
                ProviderSource::Declared {
                    class_name,
                    properties,
                } if *class_name == declaration.class_name
                    && *properties == declaration.properties =>
                {
                    entry.description = declaration.description;
                    return;
                }
                ProviderSource::Declared { .. } => {}
            }
        }

        let provider = match self
            .factory
            .create(&declaration.class_name, &declaration.properties)
        {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    "Skipping declaration '{}' for {}: {}",
                    declaration.class_name, key, e
                );
                return;
            }
        };

        self.apply(
            key,
            ProviderSource::Declared {
                class_name: declaration.class_name,
                properties: declaration.properties,
            },
            provider,
            declaration.description,
            notices,
        );
    }
}

fn sort_ids(ids: &mut [RegistrationId]) {
    ids.sort_by(|a, b| {
        a.sequence()
            .cmp(&b.sequence())
            .then_with(|| a.as_str().cmp(b.as_str()))
    });
}

static GLOBAL: RwLock<Option<Arc<AuthConfigRegistry>>> = const_rwlock(None);

/// Install the process-wide registry, returning the one it replaces.
///
/// Last writer wins; nothing is merged and nobody is notified.
pub fn install_global(registry: Arc<AuthConfigRegistry>) -> Option<Arc<AuthConfigRegistry>> {
    let previous = GLOBAL.write().replace(registry);
    info!("Installed process-wide auth config registry");
    previous
}

/// The process-wide registry, if one has been installed.
pub fn global() -> Option<Arc<AuthConfigRegistry>> {
    GLOBAL.read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chain_provider::ChainAuthConfigProvider;
    use crate::infrastructure::provider_catalog::{ProviderCatalog, PASSTHROUGH_CLASS};
    use crate::infrastructure::stores::InMemoryRegistrationStore;
    use std::sync::atomic::AtomicUsize;

    fn provider() -> Arc<dyn AuthConfigProvider> {
        Arc::new(ChainAuthConfigProvider::builder().build())
    }

    fn registry() -> AuthConfigRegistry {
        AuthConfigRegistry::new(Arc::new(ProviderCatalog::with_builtins()))
    }

    fn counting_listener() -> (Arc<dyn RegistrationListener>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let listener: Arc<dyn RegistrationListener> = Arc::new(move |_: Option<&str>, _: Option<&str>| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (listener, count)
    }

    #[test]
    fn test_ids_are_sequential() {
        let registry = registry();
        let a = registry.register_instance(provider(), Some("SOAP"), None, None);
        let b = registry.register_instance(provider(), Some("HTTP"), None, None);
        assert_eq!(a, "R1");
        assert_eq!(b, "R2");
        assert_eq!(registry.registration_ids(None), vec![a, b]);
    }

    #[test]
    fn test_replacement_keeps_id_and_notifies() {
        let registry = registry();
        let first = provider();
        let second = provider();
        let id = registry.register_instance(first.clone(), Some("SOAP"), Some("app"), Some("one"));

        let (listener, count) = counting_listener();
        assert!(registry.get_provider(Some("SOAP"), Some("app"), Some(listener)).is_some());

        let again = registry.register_instance(second.clone(), Some("SOAP"), Some("app"), Some("two"));
        assert_eq!(id, again);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let resolved = registry.get_provider(Some("SOAP"), Some("app"), None).unwrap();
        assert!(same_handle(&resolved, &second));
        assert_eq!(
            registry.registration_context(&id).unwrap().description.as_deref(),
            Some("two")
        );
        assert!(registry.registration_ids(Some(&first)).is_empty());
        assert_eq!(registry.registration_ids(Some(&second)), vec![id]);
    }

    #[test]
    fn test_listener_on_miss_notified_by_later_registration() {
        let registry = registry();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: Arc<dyn RegistrationListener> =
            Arc::new(move |layer: Option<&str>, app: Option<&str>| {
                sink.lock().push((layer.map(str::to_string), app.map(str::to_string)));
            });
        assert!(registry.get_provider(Some("SOAP"), Some("app"), Some(listener.clone())).is_none());
        assert!(registry.get_provider(Some("SOAP"), Some("app"), Some(listener)).is_none());

        let unrelated = registry.register_instance(provider(), Some("HTTP"), None, None);
        assert!(seen.lock().is_empty());

        let id = registry.register_instance(provider(), Some("SOAP"), None, None);
        assert_eq!(
            *seen.lock(),
            vec![(Some("SOAP".to_string()), Some("app".to_string()))]
        );

        registry.unregister(&id);
        registry.unregister(&unrelated);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_detached_parked_listener_is_not_notified() {
        let registry = registry();
        let (listener, count) = counting_listener();
        assert!(registry.get_provider(Some("SOAP"), None, Some(listener.clone())).is_none());
        assert!(registry.detach_listener(&listener, Some("SOAP"), None).is_empty());

        registry.register_instance(provider(), None, None, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_detach_listener_with_filters() {
        let registry = registry();
        let soap = registry.register_instance(provider(), Some("SOAP"), None, None);
        let http = registry.register_instance(provider(), Some("HTTP"), None, None);
        let (listener, count) = counting_listener();
        registry.get_provider(Some("SOAP"), None, Some(listener.clone()));
        registry.get_provider(Some("HTTP"), None, Some(listener.clone()));

        assert_eq!(registry.detach_listener(&listener, Some("SOAP"), None), vec![soap]);
        assert_eq!(registry.detach_listener(&listener, None, None), vec![http.clone()]);
        assert!(registry.detach_listener(&listener, None, None).is_empty());

        registry.unregister(&http);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_declared_registration_persists() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registry = registry().with_store(store.clone());

        let id = registry
            .register(PASSTHROUGH_CLASS, Properties::new(), Some("HTTP"), None, Some("d"))
            .unwrap();
        assert!(registry.registration_context(&id).unwrap().persistent);
        assert_eq!(registry.declared_class(&id).as_deref(), Some(PASSTHROUGH_CLASS));
        assert_eq!(store.load().unwrap().len(), 1);

        assert!(registry.unregister(&id));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_class_leaves_registry_untouched() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registry = registry().with_store(store.clone());
        let result = registry.register("nope", Properties::new(), None, None, None);
        assert!(matches!(result, Err(RegistryError::UnknownProviderClass(_))));
        assert!(registry.is_empty());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_instance_replacing_declaration_drops_it_from_store() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registry = registry().with_store(store.clone());
        let id = registry
            .register(PASSTHROUGH_CLASS, Properties::new(), Some("HTTP"), None, None)
            .unwrap();

        let replaced = registry.register_instance(provider(), Some("HTTP"), None, None);
        assert_eq!(id, replaced);
        assert!(!registry.registration_context(&id).unwrap().persistent);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_events_published() {
        let registry = registry();
        let mut receiver = registry.events().subscribe();

        let id = registry.register_instance(provider(), None, None, None);
        registry.register_instance(provider(), None, None, None);
        registry.unregister(&id);

        assert!(matches!(receiver.try_recv().unwrap(), RegistryEvent::Registered { .. }));
        assert!(matches!(receiver.try_recv().unwrap(), RegistryEvent::Replaced { .. }));
        assert!(matches!(receiver.try_recv().unwrap(), RegistryEvent::Removed { .. }));
    }

    #[test]
    fn test_global_install_last_writer_wins() {
        let first = Arc::new(registry());
        let second = Arc::new(registry());
        install_global(first.clone());
        let previous = install_global(second.clone());
        assert!(previous.is_some_and(|p| Arc::ptr_eq(&p, &first)));
        assert!(global().is_some_and(|g| Arc::ptr_eq(&g, &second)));
    }
}

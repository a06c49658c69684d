// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod registry;
pub mod provider_catalog;
pub mod stores;
pub mod event_bus;
pub mod credential_handler;
pub mod modules;

pub use registry::{global, install_global, AuthConfigRegistry};
pub use provider_catalog::{ProviderCatalog, BASIC_CLASS, PASSTHROUGH_CLASS};
pub use stores::{InMemoryRegistrationStore, YamlRegistrationStore};
pub use event_bus::{RegistryEvent, RegistryEventBus};
pub use credential_handler::InMemoryCredentialHandler;

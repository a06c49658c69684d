// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod chain_context;
pub mod chain_config;
pub mod chain_provider;

// Re-export the chain building blocks for convenience
pub use chain_context::{ChainClientAuthContext, ChainServerAuthContext, ModuleBinding, Pass};
pub use chain_config::{shared_definition, ChainAuthConfig, ChainDefinition, ContextBinding, ModuleEntry, ModuleFactory, SharedDefinition};
pub use chain_provider::{ChainAuthConfigProvider, ChainAuthConfigProviderBuilder, UnsupportedCallbackHandler};

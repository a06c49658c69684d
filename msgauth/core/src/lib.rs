// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Message authentication core
//!
//! Pluggable authentication for request/response message exchanges: a provider registry
//! with precedence lookup, auth configs resolving module chains, and the status-driven
//! chain protocol.
//!
//! # Architecture
//!
//! - **domain:** status, message exchange, policies, identity, callbacks, traits
//! - **application:** chain contexts, chain configs, chain provider
//! - **infrastructure:** registry, provider catalog, stores, event bus, built-in module

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the msgauth CLI

pub mod config;
pub mod registry;

pub use self::config::ConfigCommand;
pub use self::registry::RegistryCommand;

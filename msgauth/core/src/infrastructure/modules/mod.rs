// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Built-in authentication modules

pub mod basic;

pub use basic::BasicCredentialModule;

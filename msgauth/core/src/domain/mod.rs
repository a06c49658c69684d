// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure types and traits of the message authentication framework. No I/O apart from
//! reading and writing the registration manifest.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`status`] | `AuthStatus`, `ExchangeState` |
//! | [`message_info`] | `MessageInfo`, `Message`, `MessageType` |
//! | [`message_policy`] | `MessagePolicy`, `TargetPolicy`, `Target`, `ProtectionPolicy` |
//! | [`identity`] | `Subject`, `Principal` |
//! | [`callback`] | `Callback`, `CallbackHandler` and the callback records |
//! | [`module`] | `ClientAuthModule`, `ServerAuthModule`, `ModuleInit` |
//! | [`auth_config`] | `AuthConfigProvider`, `*AuthConfig`, `*AuthContext` |
//! | [`registration`] | `RegistrationId`, `RegistrationKey`, `RegistrationListener` |
//! | [`registry_manifest`] | `RegistryManifest`, `DeclaredRegistration` |
//! | [`repository`] | `RegistrationStore`, `ProviderFactory` |
//! | [`error`] | `AuthError`, `PolicyError`, `RegistryError`, `StoreError` |

pub mod auth_config;
pub mod callback;
pub mod error;
pub mod identity;
pub mod message_info;
pub mod message_policy;
pub mod module;
pub mod registration;
pub mod registry_manifest;
pub mod repository;
pub mod status;

pub use auth_config::*;
pub use callback::*;
pub use error::*;
pub use identity::*;
pub use message_info::*;
pub use message_policy::*;
pub use module::*;
pub use registration::*;
pub use registry_manifest::*;
pub use repository::*;
pub use status::*;

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Registry inspection commands
//!
//! Commands: list, resolve

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use msgauth_core::domain::{
    RegistrationContext, RegistrationId, RegistrationKey, RegistryManifest,
};
use msgauth_core::infrastructure::{
    AuthConfigRegistry, InMemoryRegistrationStore, ProviderCatalog,
};

#[derive(Subcommand)]
pub enum RegistryCommand {
    /// List active registrations
    List {
        /// Manifest to load (default: --registry or discovery)
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Print registrations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which registration answers a (layer, appContext) lookup
    Resolve {
        /// Message layer, omitted to match any layer
        #[arg(long)]
        layer: Option<String>,

        /// Application context, omitted to match any application context
        #[arg(long)]
        app_context: Option<String>,
    },
}

pub async fn handle_command(command: RegistryCommand, registry_path: Option<PathBuf>) -> Result<()> {
    match command {
        RegistryCommand::List { file, json } => list(file.or(registry_path), json).await,
        RegistryCommand::Resolve { layer, app_context } => {
            resolve(registry_path, layer.as_deref(), app_context.as_deref()).await
        }
    }
}

/// One row of `registry list`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Listing {
    pub id: RegistrationId,
    pub class_name: Option<String>,
    #[serde(flatten)]
    pub context: RegistrationContext,
}

/// Outcome of a precedence lookup, with every candidate key that was considered.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub candidates: Vec<(RegistrationKey, Option<RegistrationId>)>,
    pub winner: Option<RegistrationId>,
}

/// Load a manifest into a fresh registry backed by the built-in provider classes.
pub fn load_registry(path: Option<PathBuf>) -> Result<AuthConfigRegistry> {
    let manifest =
        RegistryManifest::load_or_default(path).context("Failed to load registration manifest")?;
    manifest
        .validate()
        .context("Registration manifest validation failed")?;

    let declared = manifest.spec.registrations.len();
    let store = Arc::new(InMemoryRegistrationStore::from_manifest(manifest));
    let registry =
        AuthConfigRegistry::new(Arc::new(ProviderCatalog::with_builtins())).with_store(store);

    let mut events = registry.events().subscribe();
    registry.refresh().context("Failed to apply registrations")?;
    while let Ok(event) = events.try_recv() {
        debug!("Applied registration {} for {}", event.id(), event.key());
    }

    if registry.len() < declared {
        warn!(
            "{} of {} declared registrations could not be constructed",
            declared - registry.len(),
            declared
        );
    }
    Ok(registry)
}

pub fn listings(registry: &AuthConfigRegistry) -> Vec<Listing> {
    registry
        .registration_ids(None)
        .into_iter()
        .filter_map(|id| {
            let context = registry.registration_context(&id)?;
            let class_name = registry.declared_class(&id);
            Some(Listing {
                id,
                class_name,
                context,
            })
        })
        .collect()
}

pub fn resolution(
    registry: &AuthConfigRegistry,
    layer: Option<&str>,
    app_context: Option<&str>,
) -> Resolution {
    let rows = listings(registry);
    let candidates: Vec<(RegistrationKey, Option<RegistrationId>)> =
        RegistrationKey::lookup_order(layer, app_context)
            .into_iter()
            .map(|key| {
                let id = rows
                    .iter()
                    .find(|row| {
                        row.context.layer == key.layer && row.context.app_context == key.app_context
                    })
                    .map(|row| row.id.clone());
                (key, id)
            })
            .collect();

    let winner = candidates.iter().find_map(|(_, id)| id.clone());

    Resolution { candidates, winner }
}

async fn list(path: Option<PathBuf>, as_json: bool) -> Result<()> {
    let registry = load_registry(path)?;
    let rows = listings(&registry);

    if as_json {
        let rendered =
            serde_json::to_string_pretty(&rows).context("Failed to render registrations")?;
        println!("{}", rendered);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{}", "No registrations.".yellow());
        return Ok(());
    }

    println!("{}", "Registrations:".bold());
    for row in rows {
        println!(
            "  {}  layer={} appContext={}",
            row.id.as_str().bold(),
            row.context.layer.as_deref().unwrap_or("*"),
            row.context.app_context.as_deref().unwrap_or("*"),
        );
        println!(
            "      class: {}  persistent: {}",
            row.class_name.as_deref().unwrap_or("(instance)"),
            row.context.persistent
        );
        if let Some(description) = &row.context.description {
            println!("      {}", description.dimmed());
        }
    }
    Ok(())
}

async fn resolve(path: Option<PathBuf>, layer: Option<&str>, app_context: Option<&str>) -> Result<()> {
    let registry = load_registry(path)?;
    let resolution = resolution(&registry, layer, app_context);

    println!("{}", "Lookup order:".bold());
    for (position, (key, id)) in resolution.candidates.iter().enumerate() {
        let answer = match id {
            Some(id) if Some(id) == resolution.winner.as_ref() => format!("{} ✓", id).green(),
            Some(id) => id.as_str().normal(),
            None => "-".dimmed(),
        };
        println!("  {}. {}  {}", position + 1, key, answer);
    }
    println!();

    match resolution.winner {
        Some(id) => println!("{}", format!("✓ Resolved to {}", id).green()),
        None => println!("{}", "No provider registered for this lookup".yellow()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgauth_core::application::ChainAuthConfigProvider;
    use msgauth_core::domain::AuthConfigProvider;

    const MANIFEST: &str = r#"
apiVersion: msgauth.io/v1
kind: ProviderRegistry
metadata:
  name: cli-test
spec:
  registrations:
    - className: msgauth.passthrough
      layer: HTTP
      appContext: "server /api"
      description: api
    - className: msgauth.passthrough
      description: catch-all
    - className: com.example.Missing
      layer: SOAP
"#;

    fn registry() -> (tempfile::TempDir, AuthConfigRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.yaml");
        std::fs::write(&path, MANIFEST).unwrap();
        let registry = load_registry(Some(path)).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_unresolvable_classes_are_skipped() {
        let (_dir, registry) = registry();
        let rows = listings(&registry);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "R1");
        assert_eq!(rows[0].context.description.as_deref(), Some("api"));
        assert_eq!(rows[1].class_name.as_deref(), Some("msgauth.passthrough"));
        assert!(rows.iter().all(|r| r.context.persistent));
    }

    #[test]
    fn test_resolution_prefers_exact_pair() {
        let (_dir, registry) = registry();

        let exact = resolution(&registry, Some("HTTP"), Some("server /api"));
        assert_eq!(exact.candidates.len(), 4);
        assert_eq!(exact.winner, Some(RegistrationId::from("R1")));

        let fallback = resolution(&registry, Some("HTTP"), Some("server /other"));
        assert_eq!(fallback.winner, Some(RegistrationId::from("R2")));
        assert!(fallback.candidates[0].1.is_none());
        assert_eq!(fallback.candidates[3].1, Some(RegistrationId::from("R2")));
    }

    #[test]
    fn test_winner_is_the_matched_slot_for_a_shared_provider() {
        let registry = AuthConfigRegistry::new(Arc::new(ProviderCatalog::with_builtins()));
        let shared: Arc<dyn AuthConfigProvider> =
            Arc::new(ChainAuthConfigProvider::builder().build());
        let fallback = registry.register_instance(shared.clone(), None, None, None);
        let exact = registry.register_instance(shared, Some("SOAP"), Some("app"), None);

        let resolved = resolution(&registry, Some("SOAP"), Some("app"));
        assert_eq!(resolved.winner, Some(exact));
        assert_eq!(resolved.candidates[3].1, Some(fallback));
    }

    #[test]
    fn test_missing_explicit_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_registry(Some(dir.path().join("absent.yaml"))).is_err());
    }
}

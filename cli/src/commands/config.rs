// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Manifest management commands
//!
//! Commands: validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use msgauth_core::domain::{ProviderFactory, RegistryManifest};
use msgauth_core::infrastructure::ProviderCatalog;

pub const MINIMAL_TEMPLATE: &str = include_str!("../../templates/registry-minimal.yaml");
pub const EXAMPLES_TEMPLATE: &str = include_str!("../../templates/registry-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Validate a registration manifest
    Validate {
        /// Path to manifest (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a sample registration manifest
    Generate {
        /// Output path (default: ./msgauth-registry.yaml)
        #[arg(short, long, default_value = "./msgauth-registry.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, registry_path: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Validate { file } => validate(file.or(registry_path)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

/// Structural validation plus construction of every declared provider.
pub fn check_manifest(manifest: &RegistryManifest, catalog: &ProviderCatalog) -> Result<usize> {
    manifest
        .validate()
        .context("Registration manifest validation failed")?;

    for declaration in &manifest.spec.registrations {
        catalog
            .create(&declaration.class_name, &declaration.properties)
            .with_context(|| format!("Registration {} is not constructible", declaration.key()))?;
    }
    Ok(manifest.spec.registrations.len())
}

async fn validate(path: Option<PathBuf>) -> Result<()> {
    println!("Validating registration manifest...");

    let manifest =
        RegistryManifest::load_or_default(path).context("Failed to load registration manifest")?;
    let count = check_manifest(&manifest, &ProviderCatalog::with_builtins())?;

    println!(
        "{}",
        format!("✓ Manifest '{}' is valid ({} registrations)", manifest.metadata.name, count)
            .green()
    );
    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        EXAMPLES_TEMPLATE
    } else {
        MINIMAL_TEMPLATE
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write manifest to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Manifest generated: {}", output.display()).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_valid() {
        let catalog = ProviderCatalog::with_builtins();
        for template in [MINIMAL_TEMPLATE, EXAMPLES_TEMPLATE] {
            let manifest = RegistryManifest::from_yaml_str(template).unwrap();
            assert!(check_manifest(&manifest, &catalog).unwrap() > 0);
        }
    }

    #[test]
    fn test_unknown_class_fails_validation() {
        let mut manifest = RegistryManifest::from_yaml_str(MINIMAL_TEMPLATE).unwrap();
        manifest.spec.registrations[0].class_name = "com.example.Missing".to_string();
        let err = check_manifest(&manifest, &ProviderCatalog::with_builtins()).unwrap_err();
        assert!(format!("{:#}", err).contains("com.example.Missing"));
    }

    #[tokio::test]
    async fn test_generate_writes_loadable_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("generated.yaml");
        generate(output.clone(), true).await.unwrap();

        let manifest = RegistryManifest::load_or_default(Some(output)).unwrap();
        assert_eq!(manifest.metadata.name, "example");
        assert_eq!(manifest.spec.registrations.len(), 3);
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # msgauth CLI
//!
//! The `msgauth` binary inspects and validates provider registration manifests.
//!
//! ## Commands
//!
//! - `msgauth registry list|resolve` - Load a manifest into a registry and query it
//! - `msgauth config validate|generate` - Manifest management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use msgauth_cli::commands::{self, ConfigCommand, RegistryCommand};

/// msgauth - Inspect message authentication provider registries
#[derive(Parser)]
#[command(name = "msgauth")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the registration manifest (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "MSGAUTH_REGISTRY_PATH",
        value_name = "FILE"
    )]
    registry: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "MSGAUTH_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a provider registry
    #[command(name = "registry")]
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },

    /// Manifest management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Registry { command }) => {
            commands::registry::handle_command(command, cli.registry).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.registry).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}

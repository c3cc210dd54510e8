//! # relboard CLI Module
//!
//! This module implements the CLI interface for relboard.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `seed` - Write the seed catalog into an empty store
//! - `releases` / `release` - List or show releases
//! - `hashreleases` / `hashrelease` - List or show hashreleases
//! - `step` - Set a lifecycle step to a status
//! - `advance` - Cycle a lifecycle step to its next status
//! - `dashboard` - Recent activity per project (the default)

mod commands;

use crate::config::{Backend, Config, ConfigError};
use clap::{Parser, Subcommand};
use relboard_core::{ProjectId, RelboardError, StepStatus};
use std::path::PathBuf;
use thiserror::Error;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// relboard - release tracking dashboard
///
/// Tracks releases and hashreleases per project and walks each release
/// through its lifecycle steps.
#[derive(Parser, Debug)]
#[command(name = "relboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a relboard.toml config file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the redb database (overrides [storage] path)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides [storage] backend)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to (overrides [server] host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write the seed catalog if the store has not been seeded
    Seed,

    /// List releases, newest first
    Releases {
        /// Only this project (oss, enterprise)
        #[arg(short, long)]
        project: Option<ProjectId>,
    },

    /// Show one release with its lifecycle
    Release {
        /// Release id, e.g. v2.5.0
        id: String,
    },

    /// List hashreleases, newest first
    Hashreleases {
        /// Only this project (oss, enterprise)
        #[arg(short, long)]
        project: Option<ProjectId>,
    },

    /// Show one hashrelease
    Hashrelease {
        /// Hashrelease id
        id: String,
    },

    /// Set a lifecycle step to a status
    Step {
        /// Release id
        id: String,
        /// Step name, e.g. "Images Published"
        step: String,
        /// pending, in-progress, done or error
        status: StepStatus,
    },

    /// Move a lifecycle step to its next status
    Advance {
        /// Release id
        id: String,
        /// Step name
        step: String,
    },

    /// Recent releases and hashreleases per project
    Dashboard,
}

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] RelboardError),

    #[error("JSON output failed: {0}")]
    Output(#[from] serde_json::Error),
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration: file and environment, then CLI flags.
pub fn resolve_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    if let Some(database) = &cli.database {
        config.storage.path.clone_from(database);
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CliError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_serve(&config).await
        }
        Some(Commands::Seed) => cmd_seed(&config, json_mode),
        Some(Commands::Releases { project }) => cmd_releases(&config, json_mode, project),
        Some(Commands::Release { id }) => cmd_release(&config, json_mode, &id),
        Some(Commands::Hashreleases { project }) => cmd_hashreleases(&config, json_mode, project),
        Some(Commands::Hashrelease { id }) => cmd_hashrelease(&config, json_mode, &id),
        Some(Commands::Step { id, step, status }) => {
            cmd_step(&config, json_mode, &id, &step, status)
        }
        Some(Commands::Advance { id, step }) => cmd_advance(&config, json_mode, &id, &step),
        Some(Commands::Dashboard) | None => cmd_dashboard(&config, json_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_step_command() {
        let cli = Cli::try_parse_from([
            "relboard",
            "--backend",
            "memory",
            "step",
            "v2.5.0",
            "Images Published",
            "in-progress",
        ])
        .expect("parse");

        assert_eq!(cli.backend, Some(Backend::Memory));
        match cli.command {
            Some(Commands::Step { id, step, status }) => {
                assert_eq!(id, "v2.5.0");
                assert_eq!(step, "Images Published");
                assert_eq!(status, StepStatus::InProgress);
            }
            other => unreachable!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_status_and_project() {
        assert!(Cli::try_parse_from(["relboard", "step", "v1", "Started", "later"]).is_err());
        assert!(Cli::try_parse_from(["relboard", "releases", "--project", "beta"]).is_err());
    }

    #[test]
    fn project_filter_parses() {
        let cli = Cli::try_parse_from(["relboard", "releases", "-p", "enterprise"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Releases {
                project: Some(ProjectId::Enterprise)
            })
        ));
    }

    #[test]
    fn cli_flags_override_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("relboard.toml");
        std::fs::write(
            &path,
            "[storage]\nbackend = \"redb\"\npath = \"from-file.redb\"\n",
        )
        .expect("write");

        let cli = Cli::try_parse_from([
            "relboard".to_string(),
            "--config".to_string(),
            path.display().to_string(),
            "--database".to_string(),
            "from-flag.redb".to_string(),
            "--backend".to_string(),
            "memory".to_string(),
            "dashboard".to_string(),
        ])
        .expect("parse");

        let config = resolve_config(&cli).expect("config");
        assert_eq!(config.storage.backend, Backend::Memory);
        assert_eq!(config.storage.path, PathBuf::from("from-flag.redb"));
    }
}

// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Omnigen - a unified gateway to generative AI providers.
//!
//! This is the binary entry point for the Omnigen service and its
//! operator CLI.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use omnigen_config::model::OmnigenConfig;

mod catalog;
mod doctor;
mod http;
mod serve;
mod tasks;

/// Omnigen - a unified gateway to generative AI providers.
#[derive(Parser, Debug)]
#[command(name = "omnigen", version, about, long_about = None)]
struct Cli {
    /// Path to a config file, bypassing the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API server and the poll worker.
    Serve,
    /// Run diagnostic checks against the Omnigen environment.
    Doctor {
        /// Run additional intensive checks.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// List registered providers and their priced models.
    Models {
        /// Restrict the listing to one modality (text, image, video, audio).
        #[arg(long)]
        modality: Option<String>,
        /// Print the catalog as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Submit a generation request to a provider.
    Submit(tasks::SubmitArgs),
    /// Show a task's record and audit trail.
    Status {
        /// Task identifier returned by submit.
        task_id: String,
        /// Probe the provider for a fresh status before printing.
        #[arg(long)]
        refresh: bool,
        /// Print the task view as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Cancel a task that has not reached a terminal state.
    Cancel {
        /// Task identifier returned by submit.
        task_id: String,
        /// Print the canceled record as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&Path>) -> OmnigenConfig {
    let loaded = match path {
        Some(path) => omnigen_config::load_and_validate_path(path),
        None => omnigen_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            omnigen_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let Cli {
        config: config_path,
        command,
    } = Cli::parse();

    let config = load_config(config_path.as_deref());

    let result = match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Doctor { deep, plain } => {
            doctor::run_doctor(&config, config_path.as_deref(), deep, plain).await
        }
        Commands::Models { modality, json } => {
            catalog::run_models(&config, modality.as_deref(), json)
        }
        Commands::Submit(args) => tasks::run_submit(&config, args).await,
        Commands::Status {
            task_id,
            refresh,
            json,
        } => tasks::run_status(&config, &task_id, refresh, json).await,
        Commands::Cancel { task_id, json } => tasks::run_cancel(&config, &task_id, json).await,
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve() {
        let cli = Cli::try_parse_from(["omnigen", "serve"]).expect("parse");
        assert!(matches!(cli.command, Commands::Serve));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parses_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["omnigen", "doctor", "--config", "/tmp/omnigen.toml"])
            .expect("parse");
        assert_eq!(
            cli.config.as_deref(),
            Some(Path::new("/tmp/omnigen.toml"))
        );
        assert!(matches!(
            cli.command,
            Commands::Doctor {
                deep: false,
                plain: false
            }
        ));
    }

    #[test]
    fn parses_submit_with_options() {
        let cli = Cli::try_parse_from([
            "omnigen",
            "submit",
            "kling",
            "kling-2.6/text-to-video",
            "a fox over a frozen lake",
            "--duration",
            "5",
            "--sound",
            "--wait",
        ])
        .expect("parse");
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.provider, "kling");
        assert_eq!(args.model, "kling-2.6/text-to-video");
        assert_eq!(args.duration, Some(5));
        assert!(args.sound);
        assert!(args.wait);
        assert!(!args.json);
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed).
        let config =
            omnigen_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.service.name, "omnigen");
    }
}

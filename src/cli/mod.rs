//! Command-line interface.
//!
//! Each subcommand lives in its own module as a clap `Args` struct with an async
//! `execute` taking the shared [`CliConfig`]. Global flags are parsed once here.
//!
//! ```text
//! boilerplates [-L DIR]... list [KIND] [--all] [--format text|json]
//! boilerplates show <TEMPLATE> [--format text|json]
//! boilerplates generate <TEMPLATE> [DEST] [--var k=v]... [--var-file FILE]
//!                       [--dry-run] [--force] [--no-defaults]
//! boilerplates validate [TEMPLATE] [--kind KIND]
//! boilerplates defaults list|set|remove
//! ```

pub mod common;
mod defaults;
mod generate;
mod list;
mod show;
mod validate;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::constants::CONFIG_ENV;

/// Output format for commands that support machine-readable output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    pub no_progress: bool,
    /// Explicit config file; the platform default otherwise
    pub config_path: Option<PathBuf>,
    /// Extra libraries, searched before the configured ones
    pub libraries: Vec<PathBuf>,
}

impl CliConfig {
    /// Install the stderr subscriber. `RUST_LOG` overrides the flag-derived level.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "boilerplates",
    about = "Generate Compose, Terraform and Kubernetes files from template libraries",
    version,
    long_about = "Resolves a template's variables from module defaults, template overrides, \
                  saved defaults and command-line values, validates them, and renders the \
                  template's files into a directory."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use
    #[arg(short, long, global = true, env = CONFIG_ENV, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Additional template library (repeatable, before the subcommand)
    #[arg(short = 'L', long = "library", action = ArgAction::Append, value_name = "PATH")]
    libraries: Vec<PathBuf>,

    /// Disable progress indicators
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List templates in the configured libraries
    List(list::ListCommand),

    /// Show a template's metadata and resolved variables
    Show(show::ShowCommand),

    /// Render a template into a directory
    Generate(generate::GenerateCommand),

    /// Check templates for spec, variable and rendering problems
    Validate(validate::ValidateCommand),

    /// Manage saved default values
    Defaults(defaults::DefaultsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            libraries: self.libraries.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::List(cmd) => cmd.execute(&config).await,
            Commands::Show(cmd) => cmd.execute(&config).await,
            Commands::Generate(cmd) => cmd.execute(&config).await,
            Commands::Validate(cmd) => cmd.execute(&config).await,
            Commands::Defaults(cmd) => cmd.execute(&config).await,
        }
    }
}

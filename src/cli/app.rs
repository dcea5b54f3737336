//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{plugin_cmd, run_cmd};
use crate::config::HostConfig;
use crate::logging::init_logging;
use crate::plugin::{CandidateStatus, DiscoveryReport, PluginHost};

/// Left operand used when none is given
pub const DEFAULT_LHS: f64 = 10.0;

/// Right operand used when none is given
pub const DEFAULT_RHS: f64 = 50.0;

#[derive(Parser)]
#[command(name = "binop")]
#[command(author, version, about = "Discovers binary operation plugins and runs them")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./binop.toml, then the global config)
    #[arg(long, global = true, env = "BINOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory scanned for plugin packages
    #[arg(long, global = true, env = "BINOP_PLUGIN_DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging and verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover plugins and run every one against two operands
    Run {
        /// Left operand
        #[arg(default_value_t = DEFAULT_LHS, allow_negative_numbers = true)]
        lhs: f64,

        /// Right operand
        #[arg(default_value_t = DEFAULT_RHS, allow_negative_numbers = true)]
        rhs: f64,
    },

    /// Discover plugins and list the registered ones
    List,

    /// Load a single package and report what happened
    Inspect {
        /// Path to the package archive
        package: PathBuf,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    execute(Cli::parse())
}

/// Runs an already parsed command line
pub fn execute(cli: Cli) -> Result<()> {
    let mut config = HostConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.plugin_dir {
        config.plugin_dir = dir;
    }
    config.validate()?;

    init_logging(&config.logging.level, cli.verbose);
    debug!(?config, "configuration loaded");

    let output = Output::new(cli.format, cli.verbose);
    let command = cli.command.unwrap_or(Commands::Run {
        lhs: DEFAULT_LHS,
        rhs: DEFAULT_RHS,
    });

    match command {
        Commands::Run { lhs, rhs } => {
            let (mut host, report) = start_host(&config, &output)?;
            run_cmd::run(&host, &output, lhs, rhs);
            let registered = report.registered().len();
            output.verbose_ctx(
                "run",
                &format!("{} of {} candidates registered", registered, report.candidates()),
            );
            host.close();
        }
        Commands::List => {
            let (mut host, _) = start_host(&config, &output)?;
            plugin_cmd::list(&host, &output, &config.plugin_dir);
            host.close();
        }
        Commands::Inspect { package } => {
            let host = PluginHost::from_config(&config).context("Failed to create plugin host")?;
            plugin_cmd::inspect(&host, &output, &package)?;
        }
    }

    Ok(())
}

/// Builds the host and runs discovery over the configured directory
fn start_host(config: &HostConfig, output: &Output) -> Result<(PluginHost, DiscoveryReport)> {
    let mut host = PluginHost::from_config(config).context("Failed to create plugin host")?;
    let report = host.init(&config.plugin_dir)?;

    for outcome in report.skipped().into_iter().chain(report.failed()) {
        if let CandidateStatus::Rejected(e) = &outcome.status {
            output.verbose_ctx("discover", &format!("{}: {}", outcome.path.display(), e));
        }
    }
    Ok((host, report))
}

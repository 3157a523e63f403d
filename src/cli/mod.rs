//! cli
//!
//! Command-line interface layer for forgeline.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the `tracing` subscriber
//! - Load configuration and delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers obtain a [`crate::forge::ForgePrService`]
//! from the configuration and run one lifecycle operation each.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    init_logging(verbosity, cli.debug || cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "using config file");
    }

    let ctx = commands::Context {
        config,
        verbosity,
        json: cli.json,
    };
    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr. Explicit flags override `RUST_LOG`.
fn init_logging(verbosity: Verbosity, flag_given: bool) {
    let filter = if flag_given {
        EnvFilter::new(verbosity.log_directive())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

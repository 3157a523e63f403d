//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Builds the pull request service from the loaded configuration
//! 2. Runs one lifecycle operation
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Every command involves network I/O. Handlers are synchronous wrappers
//! that run their async implementation on a fresh tokio runtime.

mod create;
mod lifecycle;
mod show;
mod watch;

pub use create::create;
pub use lifecycle::{close, merge, reopen, update};
pub use show::show;
pub use watch::watch;

use anyhow::{Context as _, Result};

use super::args::Command;
use crate::core::config::Config;
use crate::forge::{create_service, ForgePrService};
use crate::ui::output::{self, Verbosity};

/// Execution context shared by command handlers.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub verbosity: Verbosity,
    pub json: bool,
}

impl Context {
    /// Build the pull request service described by the configuration.
    pub fn service(&self) -> Result<Box<dyn ForgePrService>> {
        let settings = self.config.service_settings();
        if settings.token.is_none() {
            output::warn(
                format!(
                    "${} is not set; requests are unauthenticated",
                    self.config.token_env()
                ),
                self.verbosity,
            );
        }
        create_service(settings).context("failed to set up the forge client")
    }
}

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Create {
            source,
            target,
            title,
            body,
            draft,
        } => create(ctx, source, target, title, body, draft),
        Command::Show { number } => show(ctx, number),
        Command::Merge { number, method } => merge(ctx, number, method.into()),
        Command::Reopen { number } => reopen(ctx, number),
        Command::Close { number } => close(ctx, number),
        Command::Update {
            number,
            description,
            target,
        } => update(ctx, number, description, target),
        Command::Watch { number, interval, count } => watch(ctx, number, interval, count),
    }
}

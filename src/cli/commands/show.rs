//! cli::commands::show
//!
//! Print one pull request.

use anyhow::{Context as _, Result};

use super::Context;
use crate::state::QueryOptions;
use crate::ui::output;

/// Run the show command.
pub fn show(ctx: &Context, number: u64) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(show_async(ctx, number))
}

async fn show_async(ctx: &Context, number: u64) -> Result<()> {
    let service = ctx.service()?;
    let pr = service
        .fetch(number, QueryOptions::default())
        .await
        .with_context(|| format!("failed to read pull request !{}", number))?;

    if ctx.json {
        output::json(&pr)?;
    } else {
        output::print(output::format_detailed(&pr), ctx.verbosity);
    }
    Ok(())
}

//! cli::commands::lifecycle
//!
//! Merge, reopen, close and update.
//!
//! Each handler performs a single forge call. Failures are reported as-is;
//! nothing here retries.
//!
//! # Example
//!
//! ```bash
//! fl merge 12 --method squash
//! fl close 13
//! fl reopen 13
//! fl update 14 --target develop --description "Retargeted"
//! ```

use anyhow::{bail, Context as _, Result};

use super::Context;
use crate::forge::{ForgePrService, MergeMethod, PrStateUpdate, PrUpdate};
use crate::ui::output;

/// Run the merge command.
pub fn merge(ctx: &Context, number: u64, method: MergeMethod) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let service = ctx.service()?;
        service
            .merge(method, number)
            .await
            .with_context(|| format!("failed to merge !{}", number))?;
        output::print(format!("Merged !{} ({})", number, method), ctx.verbosity);
        Ok::<_, anyhow::Error>(())
    })
}

/// Run the reopen command.
pub fn reopen(ctx: &Context, number: u64) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let service = ctx.service()?;
        service
            .reopen(number)
            .await
            .with_context(|| format!("failed to reopen !{}", number))?;
        output::print(format!("Reopened !{}", number), ctx.verbosity);
        Ok::<_, anyhow::Error>(())
    })
}

/// Run the close command.
pub fn close(ctx: &Context, number: u64) -> Result<()> {
    let update = PrUpdate {
        state: Some(PrStateUpdate::Closed),
        ..Default::default()
    };
    run_update(ctx, number, update, "Closed")
}

/// Run the update command.
pub fn update(
    ctx: &Context,
    number: u64,
    description: Option<String>,
    target: Option<String>,
) -> Result<()> {
    let update = PrUpdate {
        description,
        state: None,
        target_base: target,
    };
    if update.is_empty() {
        bail!("nothing to update; pass --description and/or --target");
    }
    run_update(ctx, number, update, "Updated")
}

fn run_update(ctx: &Context, number: u64, update: PrUpdate, verb: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let service = ctx.service()?;
        apply(service.as_ref(), number, update).await?;
        output::print(format!("{} !{}", verb, number), ctx.verbosity);
        Ok::<_, anyhow::Error>(())
    })
}

async fn apply(service: &dyn ForgePrService, number: u64, update: PrUpdate) -> Result<()> {
    service
        .update(number, update)
        .await
        .with_context(|| format!("failed to update !{}", number))
}

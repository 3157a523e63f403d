//! cli::commands::watch
//!
//! Follow a pull request through a live query.
//!
//! The live query re-reads whenever pull request reads are invalidated. This
//! command invalidates on a timer, so each tick becomes one re-read, and
//! prints the pull request whenever it differs from the last printed version.

use std::time::Duration;

use anyhow::{Context as _, Result};

use super::Context;
use crate::forge::DetailedPullRequest;
use crate::state::{QueryOptions, QueryState};
use crate::ui::output;

/// Run the watch command.
pub fn watch(ctx: &Context, number: u64, interval: u64, count: usize) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(watch_async(ctx, number, Duration::from_secs(interval.max(1)), count))
}

async fn watch_async(ctx: &Context, number: u64, interval: Duration, count: usize) -> Result<()> {
    let service = ctx.service()?;
    let mut query = service.get(number, QueryOptions::default());

    let first = query
        .ready()
        .await
        .with_context(|| format!("failed to read pull request !{}", number))?;
    emit(ctx, &first)?;
    let mut last = first;
    let mut printed = 1;

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    while printed < count {
        tokio::select! {
            _ = ticker.tick() => {
                tracing::debug!(number, "re-reading pull request");
                service.invalidate();
            }
            delivery = query.changed() => match delivery {
                Some(QueryState::Ready(pr)) if pr != last => {
                    emit(ctx, &pr)?;
                    last = pr;
                    printed += 1;
                }
                Some(QueryState::Failed(err)) => {
                    output::warn(format!("re-reading !{} failed: {}", number, err), ctx.verbosity);
                }
                Some(_) => {}
                None => break,
            },
        }
    }
    Ok(())
}

fn emit(ctx: &Context, pr: &DetailedPullRequest) -> Result<()> {
    if ctx.json {
        output::json(pr)?;
    } else {
        output::print(output::format_detailed(pr), ctx.verbosity);
        output::print("", ctx.verbosity);
    }
    Ok(())
}

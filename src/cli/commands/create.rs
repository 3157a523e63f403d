//! cli::commands::create
//!
//! Open a pull request from a pushed branch.
//!
//! # Example
//!
//! ```bash
//! git push -u origin feature
//! fl create --source feature --target main --title "Add feature"
//! ```

use anyhow::{Context as _, Result};

use super::Context;
use crate::forge::CreatePullRequestArgs;
use crate::ui::output;

/// Run the create command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn create(
    ctx: &Context,
    source: String,
    target: String,
    title: String,
    body: String,
    draft: bool,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(create_async(
        ctx,
        CreatePullRequestArgs {
            title,
            body,
            draft,
            base_branch_name: source,
            upstream_name: target,
        },
    ))
}

async fn create_async(ctx: &Context, args: CreatePullRequestArgs) -> Result<()> {
    let service = ctx.service()?;
    let source = args.base_branch_name.clone();

    let pr = service
        .create_pr(args)
        .await
        .with_context(|| format!("failed to open a pull request from '{}'", source))?;

    if ctx.json {
        output::json(&pr)?;
    } else {
        output::print(format!("Created {}", output::format_pr_line(&pr)), ctx.verbosity);
        output::print(&pr.html_url, ctx.verbosity);
    }
    Ok(())
}

//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, pull requests are printed as JSON on stdout.

use std::fmt::Display;

use serde::Serialize;

use crate::forge::{DetailedPullRequest, PrState, PullRequest};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. `quiet` wins over `debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    /// Default `tracing` filter directive for this verbosity.
    pub fn log_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Debug => "debug",
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a value as pretty JSON (always shown).
pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line summary, e.g. `!12 [open] Add feature (feature -> main)`.
pub fn format_pr_line(pr: &PullRequest) -> String {
    let draft = if pr.draft { " (draft)" } else { "" };
    format!(
        "!{} [{}]{} {} ({} -> {})",
        pr.number, pr.state, draft, pr.title, pr.source_branch, pr.target_branch
    )
}

/// Multi-line view of a detailed pull request.
pub fn format_detailed(pr: &DetailedPullRequest) -> String {
    let mut lines = vec![format_pr_line(&pr.summary()), pr.html_url.clone()];

    if let Some(author) = &pr.author {
        lines.push(format!("author:    {}", author.username));
    }
    if !pr.reviewers.is_empty() {
        let reviewers: Vec<&str> = pr.reviewers.iter().map(|r| r.username.as_str()).collect();
        lines.push(format!("reviewers: {}", reviewers.join(", ")));
    }
    if !pr.labels.is_empty() {
        lines.push(format!("labels:    {}", pr.labels.join(", ")));
    }
    if let Some(changes) = pr.changes_count {
        lines.push(format!("changes:   {} files", changes));
    }
    lines.push(format!("comments:  {}", pr.comments_count));

    match pr.state {
        PrState::Open if pr.has_conflicts => lines.push("status:    has conflicts".to_string()),
        PrState::Open if pr.mergeable => lines.push("status:    mergeable".to_string()),
        PrState::Merged => {
            if let Some(by) = &pr.merged_by {
                lines.push(format!("merged by: {}", by.username));
            }
        }
        _ => {}
    }
    if pr.fork {
        lines.push("from a fork".to_string());
    }

    if let Some(body) = pr.body.as_deref().filter(|b| !b.trim().is_empty()) {
        lines.push(String::new());
        lines.extend(body.lines().map(|line| format!("    {}", line)));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::ForgeUser;
    use chrono::{TimeZone, Utc};

    fn detailed() -> DetailedPullRequest {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        DetailedPullRequest {
            id: 100,
            number: 12,
            html_url: "https://gitlab.com/g/p/-/merge_requests/12".into(),
            title: "Add feature".into(),
            body: Some("First line\nSecond line".into()),
            author: Some(ForgeUser {
                username: "alice".into(),
                name: None,
                avatar_url: None,
                is_bot: false,
            }),
            labels: vec!["backend".into()],
            draft: false,
            source_branch: "feature".into(),
            target_branch: "main".into(),
            sha: None,
            state: PrState::Open,
            created_at: at,
            updated_at: at,
            merged_at: None,
            closed_at: None,
            reviewers: Vec::new(),
            changes_count: Some(3),
            comments_count: 2,
            has_conflicts: false,
            mergeable: true,
            merged_by: None,
            fork: false,
        }
    }

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::Debug.log_directive(), "debug");
    }

    #[test]
    fn pr_line() {
        let mut pr = detailed().summary();
        assert_eq!(
            format_pr_line(&pr),
            "!12 [open] Add feature (feature -> main)"
        );

        pr.draft = true;
        assert!(format_pr_line(&pr).contains("(draft)"));
    }

    #[test]
    fn detailed_view() {
        let text = format_detailed(&detailed());
        assert!(text.starts_with("!12 [open] Add feature"));
        assert!(text.contains("author:    alice"));
        assert!(text.contains("changes:   3 files"));
        assert!(text.contains("status:    mergeable"));
        assert!(text.contains("    Second line"));
        assert!(!text.contains("reviewers"));
    }
}

//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of the default locations
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Print pull requests as JSON

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::forge::MergeMethod;

/// forgeline - pull request lifecycle from the command line
#[derive(Parser, Debug)]
#[command(name = "fl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print pull requests as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a pull request from a pushed branch
    #[command(
        long_about = "Open a pull request from a pushed branch.\n\n\
            Creation is retried with a fixed delay, because a branch that was \
            pushed a moment ago may not be visible to the forge yet.",
        after_help = "\
EXAMPLES:
    # Right after `git push -u origin feature`
    fl create --source feature --target main --title \"Add feature\"

    # Open as draft with a description
    fl create -s feature -t main --title \"WIP\" --body \"Not ready\" --draft"
    )]
    Create {
        /// Branch with the changes (already pushed)
        #[arg(short, long)]
        source: String,

        /// Branch to merge into
        #[arg(short, long)]
        target: String,

        /// Pull request title
        #[arg(long)]
        title: String,

        /// Pull request description
        #[arg(long, default_value = "")]
        body: String,

        /// Open as draft
        #[arg(long)]
        draft: bool,
    },

    /// Show a pull request
    Show {
        /// Pull request number (GitLab iid)
        number: u64,
    },

    /// Merge a pull request
    Merge {
        /// Pull request number (GitLab iid)
        number: u64,

        /// Merge method (merge, squash, rebase)
        #[arg(long, value_enum, default_value_t = MergeMethodArg::Merge)]
        method: MergeMethodArg,
    },

    /// Reopen a closed pull request
    Reopen {
        /// Pull request number (GitLab iid)
        number: u64,
    },

    /// Close a pull request without merging
    Close {
        /// Pull request number (GitLab iid)
        number: u64,
    },

    /// Change description or target branch
    Update {
        /// Pull request number (GitLab iid)
        number: u64,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New target branch
        #[arg(long, value_name = "BRANCH")]
        target: Option<String>,
    },

    /// Print a pull request, then again each time it changes
    #[command(after_help = "\
EXAMPLES:
    # Print the current state once
    fl watch 12

    # Poll every 10 seconds and stop after three distinct versions
    fl watch 12 --interval 10 --count 3")]
    Watch {
        /// Pull request number (GitLab iid)
        number: u64,

        /// Seconds between re-reads
        #[arg(long, default_value_t = 30, value_name = "SECS")]
        interval: u64,

        /// Stop after printing this many versions
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

/// Merge method for PRs
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethodArg {
    /// Create a merge commit
    Merge,
    /// Squash and merge
    Squash,
    /// Rebase and merge
    Rebase,
}

impl From<MergeMethodArg> for MergeMethod {
    fn from(arg: MergeMethodArg) -> Self {
        match arg {
            MergeMethodArg::Merge => MergeMethod::Merge,
            MergeMethodArg::Squash => MergeMethod::Squash,
            MergeMethodArg::Rebase => MergeMethod::Rebase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_args() {
        let cli = Cli::try_parse_from([
            "fl", "create", "-s", "feature", "-t", "main", "--title", "Add", "--draft",
        ])
        .unwrap();
        match cli.command {
            Command::Create {
                source,
                target,
                title,
                body,
                draft,
            } => {
                assert_eq!(source, "feature");
                assert_eq!(target, "main");
                assert_eq!(title, "Add");
                assert_eq!(body, "");
                assert!(draft);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fl", "show", "12", "--quiet", "--config", "x.toml"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn merge_method_defaults_to_merge() {
        let cli = Cli::try_parse_from(["fl", "merge", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Merge {
                number: 3,
                method: MergeMethodArg::Merge
            }
        ));
        assert_eq!(MergeMethod::from(MergeMethodArg::Squash), MergeMethod::Squash);
    }

    #[test]
    fn number_must_be_numeric() {
        assert!(Cli::try_parse_from(["fl", "show", "abc"]).is_err());
    }
}

//! forge::traits
//!
//! Forge-agnostic pull request types and the service trait.
//!
//! # Design
//!
//! The `ForgePrService` trait is async because every lifecycle operation
//! involves network I/O. All methods return `Result` so transport failures
//! reach the caller unchanged.
//!
//! Forge backends map their own wire objects onto [`PullRequest`] and
//! [`DetailedPullRequest`]. Callers never see the wire shape.
//!
//! # Example
//!
//! ```ignore
//! use forgeline::forge::{CreatePullRequestArgs, ForgePrService, ForgeError};
//!
//! async fn open_pr(service: &dyn ForgePrService) -> Result<(), ForgeError> {
//!     let pr = service
//!         .create_pr(CreatePullRequestArgs {
//!             title: "Add feature".to_string(),
//!             body: "Description".to_string(),
//!             draft: false,
//!             base_branch_name: "feature".to_string(),
//!             upstream_name: "main".to_string(),
//!         })
//!         .await?;
//!     println!("Created !{}: {}", pr.number, pr.html_url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::state::{LiveQuery, QueryOptions};

/// Errors from forge operations.
///
/// These map to the common failure modes of a remote hosting service. The
/// lifecycle service does not distinguish between them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A live query stopped before it produced a value.
    #[error("query closed before a value was delivered")]
    QueryClosed,
}

/// A user on the forge (author, reviewer, merger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForgeUser {
    /// Login name
    pub username: String,
    /// Display name
    pub name: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Whether the account is a bot
    pub is_bot: bool,
}

/// Pull request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    /// PR is open and awaiting review/merge
    Open,
    /// PR is closed without being merged
    Closed,
    /// PR has been merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// Summary view of a remote pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// Forge-wide identifier
    pub id: u64,
    /// Project-local number (GitLab `iid`)
    pub number: u64,
    /// Web URL for viewing
    pub html_url: String,
    /// Title
    pub title: String,
    /// Body/description
    pub body: Option<String>,
    /// Author, if the forge reported one
    pub author: Option<ForgeUser>,
    /// Label names
    pub labels: Vec<String>,
    /// Whether the PR is a draft
    pub draft: bool,
    /// Branch with the changes
    pub source_branch: String,
    /// Branch to merge into
    pub target_branch: String,
    /// Head commit of the source branch
    pub sha: Option<String>,
    /// Current state
    pub state: PrState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Pull request with the extra fields needed for display.
///
/// Every field of [`PullRequest`] is present here with the same meaning;
/// [`DetailedPullRequest::summary`] recovers that view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedPullRequest {
    pub id: u64,
    pub number: u64,
    pub html_url: String,
    pub title: String,
    pub body: Option<String>,
    pub author: Option<ForgeUser>,
    pub labels: Vec<String>,
    pub draft: bool,
    pub source_branch: String,
    pub target_branch: String,
    pub sha: Option<String>,
    pub state: PrState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Requested reviewers
    pub reviewers: Vec<ForgeUser>,
    /// Number of changed files, when the forge reports it
    pub changes_count: Option<u64>,
    /// Number of comments (GitLab `user_notes_count`)
    pub comments_count: u64,
    /// Whether the source branch conflicts with the target
    pub has_conflicts: bool,
    /// Whether the forge reports the PR as ready to merge
    pub mergeable: bool,
    /// Who merged the PR, once merged
    pub merged_by: Option<ForgeUser>,
    /// Whether the source branch lives in a different project
    pub fork: bool,
}

impl DetailedPullRequest {
    /// The summary view of this pull request.
    pub fn summary(&self) -> PullRequest {
        PullRequest {
            id: self.id,
            number: self.number,
            html_url: self.html_url.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            author: self.author.clone(),
            labels: self.labels.clone(),
            draft: self.draft,
            source_branch: self.source_branch.clone(),
            target_branch: self.target_branch.clone(),
            sha: self.sha.clone(),
            state: self.state,
            created_at: self.created_at,
            updated_at: self.updated_at,
            merged_at: self.merged_at,
            closed_at: self.closed_at,
        }
    }
}

/// Arguments for creating a pull request.
///
/// Branch names are not validated locally; a bad name fails at the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequestArgs {
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: String,
    /// Create as draft
    pub draft: bool,
    /// The already-pushed branch carrying the changes
    pub base_branch_name: String,
    /// The branch to merge into
    pub upstream_name: String,
}

/// State transition requested through [`ForgePrService::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrStateUpdate {
    Open,
    Closed,
}

/// Fields to change on an existing pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrUpdate {
    /// New description
    pub description: Option<String>,
    /// Reopen or close
    pub state: Option<PrStateUpdate>,
    /// New target branch
    pub target_base: Option<String>,
}

impl PrUpdate {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.state.is_none() && self.target_base.is_none()
    }
}

/// Merge method for merging a PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMethod {
    /// Create a merge commit
    #[default]
    Merge,
    /// Squash all commits and merge
    Squash,
    /// Rebase commits onto base branch
    Rebase,
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeMethod::Merge => write!(f, "merge"),
            MergeMethod::Squash => write!(f, "squash"),
            MergeMethod::Rebase => write!(f, "rebase"),
        }
    }
}

/// Pull request lifecycle operations against one remote project.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
/// Concurrent calls are not serialized or deduplicated; two concurrent
/// `create_pr` calls for the same branches may both create a PR.
#[async_trait]
pub trait ForgePrService: Send + Sync {
    /// Get the forge name (e.g., "gitlab").
    fn name(&self) -> &'static str;

    /// Subscribe to the loading signal.
    ///
    /// The value is `true` while a `create_pr` attempt is in flight and
    /// `false` otherwise.
    fn loading(&self) -> watch::Receiver<bool>;

    /// Create a pull request from `args.base_branch_name` into
    /// `args.upstream_name`.
    ///
    /// Retries transient failures, since a freshly pushed branch may not yet
    /// be visible to the forge. On exhaustion the last error is returned.
    async fn create_pr(&self, args: CreatePullRequestArgs) -> Result<PullRequest, ForgeError>;

    /// Read a pull request once. No retry.
    async fn fetch(
        &self,
        number: u64,
        options: QueryOptions,
    ) -> Result<DetailedPullRequest, ForgeError>;

    /// Subscribe to a pull request.
    ///
    /// The handle re-delivers the value every time a mutation invalidates
    /// pull request reads. Must be called within a tokio runtime.
    fn get(&self, number: u64, options: QueryOptions) -> LiveQuery<DetailedPullRequest>;

    /// Drop cached pull request reads and make live queries re-fetch.
    fn invalidate(&self);

    /// Merge a pull request. No retry.
    async fn merge(&self, method: MergeMethod, number: u64) -> Result<(), ForgeError>;

    /// Reopen a closed pull request.
    async fn reopen(&self, number: u64) -> Result<(), ForgeError> {
        self.update(
            number,
            PrUpdate {
                state: Some(PrStateUpdate::Open),
                ..Default::default()
            },
        )
        .await
    }

    /// Update description, state, or target branch. No retry.
    async fn update(&self, number: u64, update: PrUpdate) -> Result<(), ForgeError>;
}

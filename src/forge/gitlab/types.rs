//! forge::gitlab::types
//!
//! GitLab wire objects and their mapping onto forge-agnostic types.
//!
//! Only the merge request fields this crate reads are modelled. Unknown
//! fields in API responses are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::forge::traits::{DetailedPullRequest, ForgeUser, PrState, PullRequest};

/// A GitLab user as embedded in merge request payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Merge request as returned by `/projects/:id/merge_requests/:iid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Instance-wide id
    pub id: u64,
    /// Project-local id (the number shown as `!iid`)
    pub iid: u64,
    pub project_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `opened`, `closed`, `locked` or `merged`
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default)]
    pub source_project_id: Option<u64>,
    #[serde(default)]
    pub target_project_id: Option<u64>,
    #[serde(default)]
    pub draft: bool,
    /// Deprecated alias of `draft` still sent by older instances
    #[serde(default)]
    pub work_in_progress: bool,
    pub web_url: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub author: Option<GitLabUser>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub reviewers: Vec<GitLabUser>,
    #[serde(default)]
    pub merged_by: Option<GitLabUser>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Changed file count; a string because GitLab caps it as e.g. `"1000+"`
    #[serde(default)]
    pub changes_count: Option<String>,
    #[serde(default)]
    pub user_notes_count: u64,
    #[serde(default)]
    pub has_conflicts: bool,
    #[serde(default)]
    pub detailed_merge_status: Option<String>,
}

/// Map a GitLab `state` string onto [`PrState`].
///
/// `locked` is the short-lived state while a merge is in progress, so it
/// counts as open. Unknown states are treated as open too.
pub fn parse_state(state: &str) -> PrState {
    match state {
        "merged" => PrState::Merged,
        "closed" => PrState::Closed,
        "opened" | "locked" => PrState::Open,
        other => {
            tracing::debug!(state = other, "unknown merge request state, assuming open");
            PrState::Open
        }
    }
}

/// Parse `changes_count`, accepting the capped `"N+"` form.
fn parse_changes_count(raw: &str) -> Option<u64> {
    raw.trim().trim_end_matches('+').parse().ok()
}

impl From<&GitLabUser> for ForgeUser {
    fn from(user: &GitLabUser) -> Self {
        ForgeUser {
            username: user.username.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            is_bot: user.bot,
        }
    }
}

impl From<&MergeRequest> for PullRequest {
    fn from(mr: &MergeRequest) -> Self {
        PullRequest {
            id: mr.id,
            number: mr.iid,
            html_url: mr.web_url.clone(),
            title: mr.title.clone(),
            body: mr.description.clone(),
            author: mr.author.as_ref().map(ForgeUser::from),
            labels: mr.labels.clone(),
            draft: mr.draft || mr.work_in_progress,
            source_branch: mr.source_branch.clone(),
            target_branch: mr.target_branch.clone(),
            sha: mr.sha.clone(),
            state: parse_state(&mr.state),
            created_at: mr.created_at,
            updated_at: mr.updated_at,
            merged_at: mr.merged_at,
            closed_at: mr.closed_at,
        }
    }
}

impl From<&MergeRequest> for DetailedPullRequest {
    fn from(mr: &MergeRequest) -> Self {
        // Shared fields come from the summary mapping so both views agree.
        let PullRequest {
            id,
            number,
            html_url,
            title,
            body,
            author,
            labels,
            draft,
            source_branch,
            target_branch,
            sha,
            state,
            created_at,
            updated_at,
            merged_at,
            closed_at,
        } = PullRequest::from(mr);

        let fork = match (mr.source_project_id, mr.target_project_id) {
            (Some(source), Some(target)) => source != target,
            _ => false,
        };

        DetailedPullRequest {
            id,
            number,
            html_url,
            title,
            body,
            author,
            labels,
            draft,
            source_branch,
            target_branch,
            sha,
            state,
            created_at,
            updated_at,
            merged_at,
            closed_at,
            reviewers: mr.reviewers.iter().map(ForgeUser::from).collect(),
            changes_count: mr.changes_count.as_deref().and_then(parse_changes_count),
            comments_count: mr.user_notes_count,
            has_conflicts: mr.has_conflicts,
            mergeable: mr.detailed_merge_status.as_deref() == Some("mergeable"),
            merged_by: mr.merged_by.as_ref().map(ForgeUser::from),
            fork,
        }
    }
}

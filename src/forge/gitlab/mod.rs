//! forge::gitlab
//!
//! GitLab merge request support.
//!
//! - [`client`]: REST transport (`GitLabClient`) behind the [`GitLabApi`] trait
//! - [`types`]: wire objects and their mapping onto forge-agnostic types
//! - [`service`]: [`GitLabPrService`], the lifecycle service with retrying create
//! - [`url`]: remote URL parsing
//!
//! GitLab calls pull requests "merge requests" and numbers them per project
//! (`iid`). The forge-agnostic `number` is always the `iid`.

pub mod client;
pub mod service;
pub mod types;
pub mod url;

pub use client::{
    draft_title, CreateOptions, EditOptions, GitLabApi, GitLabClient, MergeOptions, StateEvent,
    DEFAULT_API_BASE,
};
pub use service::{GitLabPrService, PR_CREATED_EVENT};
pub use types::{parse_state, GitLabUser, MergeRequest};
pub use url::{is_gitlab_url, parse_gitlab_url, parse_gitlab_url_for_host, DEFAULT_HOST};

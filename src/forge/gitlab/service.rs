//! forge::gitlab::service
//!
//! Pull request lifecycle service backed by a [`GitLabApi`] transport.
//!
//! # Design
//!
//! - `create_pr` retries with a fixed delay, because a merge request created
//!   right after a push can fail until GitLab has seen the branch. Each
//!   attempt issues a new creation request; a response lost in transit can
//!   therefore produce a duplicate merge request.
//! - Every other operation is a single transport call whose error is passed
//!   through unchanged.
//! - Successful mutations invalidate [`Tag::GitLabPullRequests`], so cached
//!   reads are dropped and live queries re-fetch.
//! - The loading signal is raised only while a create attempt is talking to
//!   the forge.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use super::client::{CreateOptions, EditOptions, GitLabApi, MergeOptions, StateEvent};
use crate::forge::retry::{retry_with_fixed_delay, RetryPolicy};
use crate::forge::traits::{
    CreatePullRequestArgs, DetailedPullRequest, ForgeError, ForgePrService, MergeMethod,
    PrStateUpdate, PrUpdate, PullRequest,
};
use crate::state::{
    Fetcher, InvalidationBus, LiveQuery, LoadingSignal, QueryCache, QueryFuture, QueryOptions,
    Tag,
};
use crate::telemetry::Telemetry;

/// Telemetry event emitted once per successfully created pull request.
pub const PR_CREATED_EVENT: &str = "PR Successful";

/// GitLab implementation of [`ForgePrService`].
pub struct GitLabPrService {
    api: Arc<dyn GitLabApi>,
    telemetry: Option<Arc<dyn Telemetry>>,
    retry: RetryPolicy,
    loading: LoadingSignal,
    cache: QueryCache<u64, DetailedPullRequest>,
}

impl std::fmt::Debug for GitLabPrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabPrService")
            .field("project", &self.api.project())
            .field("has_telemetry", &self.telemetry.is_some())
            .field("retry", &self.retry)
            .field("loading", &self.loading.is_loading())
            .finish()
    }
}

impl GitLabPrService {
    /// Create a service over `api` with the default create retry policy and
    /// no telemetry.
    pub fn new(api: Arc<dyn GitLabApi>) -> Self {
        Self {
            api,
            telemetry: None,
            retry: RetryPolicy::CREATE_AFTER_PUSH,
            loading: LoadingSignal::new(),
            cache: QueryCache::new(InvalidationBus::new()),
        }
    }

    /// Record product events on `telemetry`.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Override the retry policy used by `create_pr`.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Publish invalidations on a shared bus instead of a private one.
    pub fn with_bus(mut self, bus: InvalidationBus) -> Self {
        self.cache = QueryCache::new(bus);
        self
    }

    /// The invalidation bus used by this service's cache.
    pub fn bus(&self) -> &InvalidationBus {
        self.cache.bus()
    }

    /// The create retry policy in effect.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Whether a create attempt is in flight right now.
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    fn detailed_fetcher(&self, number: u64) -> Fetcher<DetailedPullRequest> {
        let api = Arc::clone(&self.api);
        Arc::new(move || -> QueryFuture<DetailedPullRequest> {
            let api = Arc::clone(&api);
            Box::pin(async move {
                api.show(number)
                    .await
                    .map(|mr| DetailedPullRequest::from(&mr))
            })
        })
    }
}

impl From<MergeMethod> for MergeOptions {
    fn from(method: MergeMethod) -> Self {
        match method {
            MergeMethod::Squash => MergeOptions { squash: Some(true) },
            // GitLab picks merge commit vs. fast-forward from project settings.
            MergeMethod::Merge | MergeMethod::Rebase => MergeOptions { squash: None },
        }
    }
}

impl From<PrStateUpdate> for StateEvent {
    fn from(state: PrStateUpdate) -> Self {
        match state {
            PrStateUpdate::Open => StateEvent::Reopen,
            PrStateUpdate::Closed => StateEvent::Close,
        }
    }
}

impl From<PrUpdate> for EditOptions {
    fn from(update: PrUpdate) -> Self {
        EditOptions {
            target_branch: update.target_base,
            description: update.description,
            state_event: update.state.map(StateEvent::from),
        }
    }
}

#[async_trait]
impl ForgePrService for GitLabPrService {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    async fn create_pr(&self, args: CreatePullRequestArgs) -> Result<PullRequest, ForgeError> {
        let CreatePullRequestArgs {
            title,
            body,
            draft,
            base_branch_name,
            upstream_name,
        } = args;
        let options = CreateOptions {
            description: Some(body),
            draft,
        };

        let source = base_branch_name.as_str();
        let target = upstream_name.as_str();
        let title = title.as_str();
        let api = &self.api;
        let loading = &self.loading;

        let mr = retry_with_fixed_delay(self.retry, |attempt| {
            let options = options.clone();
            async move {
                tracing::debug!(attempt, source, target, "creating merge request");
                let _loading = loading.begin();
                api.create(source, target, title, options).await
            }
        })
        .await?;

        tracing::info!(number = mr.iid, source, target, "created merge request");
        if let Some(telemetry) = &self.telemetry {
            telemetry.capture(PR_CREATED_EVENT);
        }
        self.cache.invalidate(Tag::GitLabPullRequests);

        Ok(PullRequest::from(&mr))
    }

    async fn fetch(
        &self,
        number: u64,
        options: QueryOptions,
    ) -> Result<DetailedPullRequest, ForgeError> {
        let api = &self.api;
        self.cache
            .fetch(number, Tag::GitLabPullRequests, options, || async move {
                api.show(number)
                    .await
                    .map(|mr| DetailedPullRequest::from(&mr))
            })
            .await
    }

    fn get(&self, number: u64, options: QueryOptions) -> LiveQuery<DetailedPullRequest> {
        self.cache.watch(
            number,
            Tag::GitLabPullRequests,
            options,
            self.detailed_fetcher(number),
        )
    }

    fn invalidate(&self) {
        self.cache.invalidate(Tag::GitLabPullRequests);
    }

    async fn merge(&self, method: MergeMethod, number: u64) -> Result<(), ForgeError> {
        tracing::debug!(number, %method, "merging merge request");
        self.api.merge(number, MergeOptions::from(method)).await?;
        self.cache.invalidate(Tag::GitLabPullRequests);
        Ok(())
    }

    async fn update(&self, number: u64, update: PrUpdate) -> Result<(), ForgeError> {
        tracing::debug!(number, ?update, "updating merge request");
        self.api.edit(number, EditOptions::from(update)).await?;
        self.cache.invalidate(Tag::GitLabPullRequests);
        Ok(())
    }
}

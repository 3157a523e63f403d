//! forge::mock
//!
//! In-memory GitLab transport for deterministic testing.
//!
//! # Design
//!
//! [`MockGitLab`] implements [`GitLabApi`] over a map of merge requests. It
//! records every call and can be told to fail specific operations, either
//! once (queued with [`MockGitLab::fail_next`]) or until cleared
//! ([`MockGitLab::fail_on`]). Clones share state, so a test can hand one
//! clone to a service and inspect the other.
//!
//! # Example
//!
//! ```
//! use forgeline::forge::gitlab::{CreateOptions, GitLabApi};
//! use forgeline::forge::mock::MockGitLab;
//!
//! # tokio_test::block_on(async {
//! let gitlab = MockGitLab::new();
//!
//! let mr = gitlab
//!     .create("feature", "main", "Add feature", CreateOptions::default())
//!     .await
//!     .unwrap();
//! assert_eq!(mr.iid, 1);
//! assert_eq!(mr.state, "opened");
//!
//! let shown = gitlab.show(1).await.unwrap();
//! assert_eq!(shown.title, "Add feature");
//! # });
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use super::gitlab::{
    draft_title, CreateOptions, EditOptions, GitLabApi, GitLabUser, MergeOptions, MergeRequest,
    StateEvent,
};
use super::traits::ForgeError;

const MOCK_PROJECT: &str = "mock/project";
const MOCK_PROJECT_ID: u64 = 1;

/// Mock GitLab transport.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockGitLab {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug)]
struct MockInner {
    merge_requests: HashMap<u64, MergeRequest>,
    next_iid: u64,
    next_id: u64,
    /// Failures consumed one per matching call.
    fail_next: VecDeque<FailOn>,
    /// Failure applied to every matching call until cleared.
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
    loading_observer: Option<watch::Receiver<bool>>,
    loading_seen: Vec<bool>,
}

/// Which transport call should fail, and with what.
#[derive(Debug, Clone)]
pub enum FailOn {
    Show(ForgeError),
    Create(ForgeError),
    Merge(ForgeError),
    Edit(ForgeError),
}

impl FailOn {
    fn error_for(&self, kind: OpKind) -> Option<ForgeError> {
        match (self, kind) {
            (FailOn::Show(e), OpKind::Show)
            | (FailOn::Create(e), OpKind::Create)
            | (FailOn::Merge(e), OpKind::Merge)
            | (FailOn::Edit(e), OpKind::Edit) => Some(e.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Show,
    Create,
    Merge,
    Edit,
}

/// Recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Show {
        number: u64,
    },
    Create {
        source_branch: String,
        target_branch: String,
        title: String,
        description: Option<String>,
        draft: bool,
    },
    Merge {
        number: u64,
        squash: Option<bool>,
    },
    Edit {
        number: u64,
        target_branch: Option<String>,
        description: Option<String>,
        state_event: Option<StateEvent>,
    },
}

impl MockOperation {
    fn kind(&self) -> OpKind {
        match self {
            MockOperation::Show { .. } => OpKind::Show,
            MockOperation::Create { .. } => OpKind::Create,
            MockOperation::Merge { .. } => OpKind::Merge,
            MockOperation::Edit { .. } => OpKind::Edit,
        }
    }
}

impl MockGitLab {
    /// Create an empty mock. The first created merge request gets `!1`.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create an empty mock whose first created merge request gets `!iid`,
    /// with the same value as its global id.
    pub fn starting_at(iid: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                merge_requests: HashMap::new(),
                next_iid: iid,
                next_id: iid,
                fail_next: VecDeque::new(),
                fail_on: None,
                operations: Vec::new(),
                loading_observer: None,
                loading_seen: Vec::new(),
            })),
        }
    }

    /// Create a mock holding existing merge requests, keyed by `iid`.
    pub fn with_merge_requests(merge_requests: Vec<MergeRequest>) -> Self {
        let next_iid = merge_requests.iter().map(|mr| mr.iid).max().unwrap_or(0) + 1;
        let mock = Self::starting_at(next_iid);
        {
            let mut inner = mock.lock();
            inner.merge_requests = merge_requests.into_iter().map(|mr| (mr.iid, mr)).collect();
        }
        mock
    }

    /// Fail every matching call until [`clear_fail_on`](Self::clear_fail_on).
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Fail the next matching call only. Queued failures are consumed in order.
    pub fn fail_next(self, fail_on: FailOn) -> Self {
        self.lock().fail_next.push_back(fail_on);
        self
    }

    /// Drop the persistent failure.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Sample `observer` at the start of every create call.
    ///
    /// Used to observe a loading signal from inside the transport.
    pub fn with_loading_observer(self, observer: watch::Receiver<bool>) -> Self {
        self.lock().loading_observer = Some(observer);
        self
    }

    /// Observed loading values seen by create calls, in call order.
    pub fn loading_seen(&self) -> Vec<bool> {
        self.lock().loading_seen.clone()
    }

    /// All recorded calls.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    pub fn show_calls(&self) -> usize {
        self.count(OpKind::Show)
    }

    pub fn create_calls(&self) -> usize {
        self.count(OpKind::Create)
    }

    pub fn merge_calls(&self) -> usize {
        self.count(OpKind::Merge)
    }

    pub fn edit_calls(&self) -> usize {
        self.count(OpKind::Edit)
    }

    /// Stored merge request by `iid` (for test verification).
    pub fn merge_request(&self, iid: u64) -> Option<MergeRequest> {
        self.lock().merge_requests.get(&iid).cloned()
    }

    /// Number of stored merge requests.
    pub fn len(&self) -> usize {
        self.lock().merge_requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count(&self, kind: OpKind) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| op.kind() == kind)
            .count()
    }

    /// Record `op` and return the configured failure for it, if any.
    fn record(inner: &mut MockInner, op: MockOperation) -> Result<(), ForgeError> {
        let kind = op.kind();
        inner.operations.push(op);

        let queued = inner
            .fail_next
            .iter()
            .position(|fail| fail.error_for(kind).is_some());
        if let Some(index) = queued {
            if let Some(err) = inner.fail_next.remove(index).and_then(|f| f.error_for(kind)) {
                return Err(err);
            }
        }

        match inner.fail_on.as_ref().and_then(|fail| fail.error_for(kind)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for MockGitLab {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(number: u64) -> ForgeError {
    ForgeError::NotFound(format!("merge request !{}", number))
}

#[async_trait]
impl GitLabApi for MockGitLab {
    fn project(&self) -> &str {
        MOCK_PROJECT
    }

    async fn show(&self, number: u64) -> Result<MergeRequest, ForgeError> {
        let mut inner = self.lock();
        Self::record(&mut inner, MockOperation::Show { number })?;

        inner
            .merge_requests
            .get(&number)
            .cloned()
            .ok_or_else(|| not_found(number))
    }

    async fn create(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        options: CreateOptions,
    ) -> Result<MergeRequest, ForgeError> {
        let mut inner = self.lock();
        let seen = inner.loading_observer.as_ref().map(|observer| *observer.borrow());
        if let Some(seen) = seen {
            inner.loading_seen.push(seen);
        }
        Self::record(
            &mut inner,
            MockOperation::Create {
                source_branch: source_branch.to_string(),
                target_branch: target_branch.to_string(),
                title: title.to_string(),
                description: options.description.clone(),
                draft: options.draft,
            },
        )?;

        let iid = inner.next_iid;
        let id = inner.next_id;
        inner.next_iid += 1;
        inner.next_id += 1;

        let now = Utc::now();
        let mr = MergeRequest {
            id,
            iid,
            project_id: MOCK_PROJECT_ID,
            title: if options.draft {
                draft_title(title)
            } else {
                title.to_string()
            },
            description: options.description,
            state: "opened".to_string(),
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
            source_project_id: Some(MOCK_PROJECT_ID),
            target_project_id: Some(MOCK_PROJECT_ID),
            draft: options.draft,
            work_in_progress: options.draft,
            web_url: format!("https://gitlab.com/{}/-/merge_requests/{}", MOCK_PROJECT, iid),
            sha: None,
            author: Some(GitLabUser {
                id: 1,
                username: "mock-user".to_string(),
                name: Some("Mock User".to_string()),
                avatar_url: None,
                bot: false,
            }),
            labels: Vec::new(),
            reviewers: Vec::new(),
            merged_by: None,
            created_at: now,
            updated_at: now,
            merged_at: None,
            closed_at: None,
            changes_count: None,
            user_notes_count: 0,
            has_conflicts: false,
            detailed_merge_status: Some("mergeable".to_string()),
        };

        inner.merge_requests.insert(iid, mr.clone());
        Ok(mr)
    }

    async fn merge(&self, number: u64, options: MergeOptions) -> Result<MergeRequest, ForgeError> {
        let mut inner = self.lock();
        Self::record(
            &mut inner,
            MockOperation::Merge {
                number,
                squash: options.squash,
            },
        )?;

        let mr = inner
            .merge_requests
            .get_mut(&number)
            .ok_or_else(|| not_found(number))?;
        if mr.state != "opened" {
            return Err(ForgeError::ApiError {
                status: 405,
                message: format!("merge request !{} is {}", number, mr.state),
            });
        }

        let now = Utc::now();
        mr.state = "merged".to_string();
        mr.merged_at = Some(now);
        mr.updated_at = now;
        Ok(mr.clone())
    }

    async fn edit(&self, number: u64, options: EditOptions) -> Result<MergeRequest, ForgeError> {
        let mut inner = self.lock();
        Self::record(
            &mut inner,
            MockOperation::Edit {
                number,
                target_branch: options.target_branch.clone(),
                description: options.description.clone(),
                state_event: options.state_event,
            },
        )?;

        let mr = inner
            .merge_requests
            .get_mut(&number)
            .ok_or_else(|| not_found(number))?;

        if let Some(description) = options.description {
            mr.description = Some(description);
        }
        if let Some(target_branch) = options.target_branch {
            mr.target_branch = target_branch;
        }
        let now = Utc::now();
        match options.state_event {
            Some(StateEvent::Close) if mr.state == "opened" => {
                mr.state = "closed".to_string();
                mr.closed_at = Some(now);
            }
            Some(StateEvent::Reopen) if mr.state == "closed" => {
                mr.state = "opened".to_string();
                mr.closed_at = None;
            }
            _ => {}
        }
        mr.updated_at = now;
        Ok(mr.clone())
    }
}

//! state::tags
//!
//! Cache tags and the invalidation event bus.
//!
//! A mutation publishes the tag of the reads it makes stale; every live query
//! subscribed to the bus re-fetches when its tag comes through.
//!
//! Each tag also carries a generation number, bumped on every publish. Caches
//! sharing the bus compare it against the generation an entry was read at,
//! so a read that raced a mutation is never served afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

/// Capacity of the invalidation channel. Lagging subscribers re-fetch.
const BUS_CAPACITY: usize = 64;

/// Class of cached reads that a mutation can invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Pull request reads against the GitLab forge
    GitLabPullRequests,
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::GitLabPullRequests => write!(f, "gitlab-pull-requests"),
        }
    }
}

/// Broadcast bus carrying invalidated tags.
///
/// Cloning yields another handle to the same bus.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    tx: broadcast::Sender<Tag>,
    generations: Arc<Mutex<HashMap<Tag, u64>>>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self {
            tx,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// How many times `tag` has been published on this bus.
    pub fn generation(&self, tag: Tag) -> u64 {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tag)
            .copied()
            .unwrap_or(0)
    }

    /// Publish an invalidation.
    ///
    /// The generation is bumped even when nobody is subscribed.
    pub fn publish(&self, tag: Tag) {
        *self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(tag)
            .or_insert(0) += 1;
        let delivered = self.tx.send(tag).unwrap_or(0);
        tracing::debug!(%tag, subscribers = delivered, "published invalidation");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Tag> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

//! state::cache
//!
//! Tag-aware query cache with live query handles.
//!
//! # Design
//!
//! Each cached value is stored under a key together with the [`Tag`] that
//! covers it. [`QueryCache::invalidate`] drops every entry with the given tag
//! and publishes the tag on the [`InvalidationBus`].
//!
//! Entries also record the bus generation of their tag as it was *before* the
//! read started. An entry whose generation no longer matches the bus is a
//! miss. This covers reads that were in flight when a mutation landed, and
//! mutations made through another cache sharing the same bus.
//!
//! A [`LiveQuery`] is an observer: [`QueryCache::watch`] spawns a task that
//! performs the initial read, then re-runs the read whenever its tag is
//! published. The task exits once every clone of the handle is dropped.
//! Reading the handle never touches the network.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

use super::tags::{InvalidationBus, Tag};
use crate::forge::ForgeError;

/// Boxed future returned by a [`Fetcher`].
pub type QueryFuture<V> = Pin<Box<dyn Future<Output = Result<V, ForgeError>> + Send>>;

/// Re-runnable read used by live queries.
pub type Fetcher<V> = Arc<dyn Fn() -> QueryFuture<V> + Send + Sync>;

/// Per-read options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Ignore any cached value and go to the forge.
    pub force_refetch: bool,
}

impl QueryOptions {
    pub fn refetch() -> Self {
        Self {
            force_refetch: true,
        }
    }
}

/// Latest state of a live query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState<V> {
    /// No value delivered yet
    Loading,
    /// Most recent successful read
    Ready(V),
    /// Most recent read failed
    Failed(ForgeError),
}

impl<V> QueryState<V> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    /// The value, if the last read succeeded.
    pub fn value(&self) -> Option<&V> {
        match self {
            QueryState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    tag: Tag,
    generation: u64,
    value: V,
}

/// Cache of reads keyed by `K`.
///
/// Cloning yields another handle to the same entries and bus.
#[derive(Debug)]
pub struct QueryCache<K, V> {
    entries: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    bus: InvalidationBus,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            bus: self.bus.clone(),
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache attached to `bus`.
    pub fn new(bus: InvalidationBus) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            bus,
        }
    }

    /// The bus this cache publishes invalidations on.
    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`, if any and still current.
    ///
    /// An entry invalidated through the bus is dropped here.
    pub fn cached(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.generation == self.bus.generation(entry.tag) {
            return Some(entry.value.clone());
        }
        entries.remove(key);
        None
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Store `value` if no invalidation of `tag` happened since `generation`.
    fn store(&self, key: K, tag: Tag, generation: u64, value: V) {
        if self.bus.generation(tag) != generation {
            tracing::debug!(%tag, "read raced an invalidation, not caching it");
            return;
        }
        self.lock().insert(
            key,
            CacheEntry {
                tag,
                generation,
                value,
            },
        );
    }

    /// Read through the cache.
    ///
    /// Returns the cached value unless it is missing or
    /// `options.force_refetch` is set. Errors from `fetcher` are returned
    /// unchanged and nothing is cached. A value read while `tag` was
    /// invalidated is returned to this caller but not cached.
    pub async fn fetch<F, Fut>(
        &self,
        key: K,
        tag: Tag,
        options: QueryOptions,
        fetcher: F,
    ) -> Result<V, ForgeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ForgeError>>,
    {
        if !options.force_refetch {
            if let Some(value) = self.cached(&key) {
                return Ok(value);
            }
        }

        let generation = self.bus.generation(tag);
        let value = fetcher().await?;
        self.store(key, tag, generation, value.clone());
        Ok(value)
    }

    /// Drop every entry covered by `tag` and notify live queries.
    pub fn invalidate(&self, tag: Tag) {
        self.lock().retain(|_, entry| entry.tag != tag);
        self.bus.publish(tag);
    }

    /// Subscribe to `key`.
    ///
    /// A cached value is delivered immediately unless `force_refetch` is set;
    /// otherwise the handle starts in [`QueryState::Loading`]. Must be called
    /// within a tokio runtime.
    pub fn watch(
        &self,
        key: K,
        tag: Tag,
        options: QueryOptions,
        fetcher: Fetcher<V>,
    ) -> LiveQuery<V> {
        let initial = if options.force_refetch {
            None
        } else {
            self.cached(&key)
        };
        let needs_fetch = initial.is_none();
        let (tx, rx) = watch::channel(initial.map_or(QueryState::Loading, QueryState::Ready));

        // Subscribe before spawning so no invalidation is missed.
        let mut invalidations = self.bus.subscribe();
        let cache = self.clone();

        tokio::spawn(async move {
            if needs_fetch {
                cache.refresh(&key, tag, &fetcher, &tx).await;
            }
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    received = invalidations.recv() => match received {
                        Ok(published) if published == tag => {
                            cache.refresh(&key, tag, &fetcher, &tx).await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "live query lagged, re-fetching");
                            cache.refresh(&key, tag, &fetcher, &tx).await;
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        LiveQuery { rx }
    }

    async fn refresh(
        &self,
        key: &K,
        tag: Tag,
        fetcher: &Fetcher<V>,
        tx: &watch::Sender<QueryState<V>>,
    ) {
        let generation = self.bus.generation(tag);
        let state = match fetcher().await {
            Ok(value) => {
                self.store(key.clone(), tag, generation, value.clone());
                QueryState::Ready(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, %tag, "live query read failed");
                QueryState::Failed(err)
            }
        };
        tx.send_replace(state);
    }
}

/// Handle to a live query.
///
/// Cloning yields another observer of the same query.
#[derive(Debug, Clone)]
pub struct LiveQuery<V> {
    rx: watch::Receiver<QueryState<V>>,
}

impl<V: Clone> LiveQuery<V> {
    /// Snapshot of the latest state.
    pub fn current(&self) -> QueryState<V> {
        self.rx.borrow().clone()
    }

    /// Wait for the next delivery.
    ///
    /// Returns `None` once the query has stopped.
    pub async fn changed(&mut self) -> Option<QueryState<V>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the query has a value or an error.
    pub async fn ready(&mut self) -> Result<V, ForgeError> {
        loop {
            match &*self.rx.borrow_and_update() {
                QueryState::Ready(value) => return Ok(value.clone()),
                QueryState::Failed(err) => return Err(err.clone()),
                QueryState::Loading => {}
            }
            if self.rx.changed().await.is_err() {
                return Err(ForgeError::QueryClosed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn counting_fetcher(calls: Arc<AtomicU32>) -> Fetcher<u32> {
        Arc::new(move || -> QueryFuture<u32> {
            let calls = Arc::clone(&calls);
            Box::pin(async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) })
        })
    }

    #[tokio::test]
    async fn fetch_caches_value() {
        let cache: QueryCache<u64, String> = QueryCache::new(InvalidationBus::new());

        let first = cache
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Ok::<_, ForgeError>("first".to_string())
            })
            .await
            .unwrap();
        let second = cache
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Ok::<_, ForgeError>("second".to_string())
            })
            .await
            .unwrap();

        assert_eq!(first, "first");
        assert_eq!(second, "first");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn force_refetch_bypasses_cache() {
        let cache: QueryCache<u64, String> = QueryCache::new(InvalidationBus::new());
        cache
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Ok::<_, ForgeError>("stale".to_string())
            })
            .await
            .unwrap();

        let fresh = cache
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::refetch(), || async {
                Ok::<_, ForgeError>("fresh".to_string())
            })
            .await
            .unwrap();

        assert_eq!(fresh, "fresh");
        assert_eq!(cache.cached(&1).as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn fetch_error_is_not_cached() {
        let cache: QueryCache<u64, String> = QueryCache::new(InvalidationBus::new());
        let err = cache
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Err::<String, _>(ForgeError::NotFound("merge request !1".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(err, ForgeError::NotFound("merge request !1".into()));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidate_drops_tagged_entries() {
        let cache: QueryCache<u64, String> = QueryCache::new(InvalidationBus::new());
        cache
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Ok::<_, ForgeError>("value".to_string())
            })
            .await
            .unwrap();

        cache.invalidate(Tag::GitLabPullRequests);

        assert!(cache.cached(&1).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_read_that_races_invalidation_is_not_cached() {
        let cache: QueryCache<u64, String> = QueryCache::new(InvalidationBus::new());

        let in_flight = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                        // Snapshot taken before the mutation, delivered after it.
                        let snapshot = "Body".to_string();
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok::<_, ForgeError>(snapshot)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate(Tag::GitLabPullRequests);

        assert_eq!(in_flight.await.unwrap().unwrap(), "Body");
        assert!(cache.cached(&1).is_none());

        let after = cache
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Ok::<_, ForgeError>("Edited".to_string())
            })
            .await
            .unwrap();
        assert_eq!(after, "Edited");
        assert_eq!(cache.cached(&1).as_deref(), Some("Edited"));
    }

    #[tokio::test]
    async fn invalidation_from_another_cache_on_the_bus() {
        let bus = InvalidationBus::new();
        let reader: QueryCache<u64, String> = QueryCache::new(bus.clone());
        let writer: QueryCache<u64, String> = QueryCache::new(bus);
        reader
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Ok::<_, ForgeError>("Body".to_string())
            })
            .await
            .unwrap();

        writer.invalidate(Tag::GitLabPullRequests);

        assert!(reader.cached(&1).is_none());
        assert!(reader.is_empty());
        let after = reader
            .fetch(1, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Ok::<_, ForgeError>("Edited".to_string())
            })
            .await
            .unwrap();
        assert_eq!(after, "Edited");
    }

    #[tokio::test]
    async fn live_query_delivers_initial_value() {
        let cache: QueryCache<u64, u32> = QueryCache::new(InvalidationBus::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut query = cache.watch(
            5,
            Tag::GitLabPullRequests,
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls)),
        );

        assert_eq!(query.ready().await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached(&5), Some(1));
    }

    #[tokio::test]
    async fn live_query_uses_cached_value_without_fetching() {
        let cache: QueryCache<u64, u32> = QueryCache::new(InvalidationBus::new());
        cache
            .fetch(5, Tag::GitLabPullRequests, QueryOptions::default(), || async {
                Ok::<_, ForgeError>(40)
            })
            .await
            .unwrap();
        let calls = Arc::new(AtomicU32::new(0));

        let query = cache.watch(
            5,
            Tag::GitLabPullRequests,
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls)),
        );

        assert_eq!(query.current(), QueryState::Ready(40));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn live_query_refetches_on_invalidation() {
        let cache: QueryCache<u64, u32> = QueryCache::new(InvalidationBus::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut query = cache.watch(
            5,
            Tag::GitLabPullRequests,
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls)),
        );
        assert_eq!(query.ready().await.unwrap(), 1);

        cache.invalidate(Tag::GitLabPullRequests);

        assert_eq!(query.changed().await, Some(QueryState::Ready(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn live_query_reports_failure() {
        let cache: QueryCache<u64, u32> = QueryCache::new(InvalidationBus::new());
        let fetcher: Fetcher<u32> =
            Arc::new(|| -> QueryFuture<u32> { Box::pin(async { Err(ForgeError::RateLimited) }) });

        let mut query = cache.watch(5, Tag::GitLabPullRequests, QueryOptions::default(), fetcher);

        assert_eq!(query.ready().await, Err(ForgeError::RateLimited));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn task_stops_when_handles_dropped() {
        let bus = InvalidationBus::new();
        let cache: QueryCache<u64, u32> = QueryCache::new(bus.clone());
        let calls = Arc::new(AtomicU32::new(0));

        let mut query = cache.watch(
            5,
            Tag::GitLabPullRequests,
            QueryOptions::default(),
            counting_fetcher(Arc::clone(&calls)),
        );
        query.ready().await.unwrap();
        assert_eq!(bus.subscriber_count(), 1);

        drop(query);
        for _ in 0..10 {
            if bus.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn query_state_accessors() {
        let loading: QueryState<u32> = QueryState::Loading;
        assert!(loading.is_loading());
        assert!(loading.value().is_none());
        assert_eq!(QueryState::Ready(3).value(), Some(&3));
        assert!(QueryState::<u32>::Failed(ForgeError::RateLimited)
            .value()
            .is_none());
    }
}

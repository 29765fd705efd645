// ── Query cache ──
//
// Keyed, reactive store for query results. Each key owns an `Entry` with a
// `watch` channel carrying its latest snapshot, the in-flight shared fetch
// (so concurrent callers share one request), and the fetcher last
// registered for it (so invalidation can refetch observed keys).
//
// Every entry carries a generation, bumped when it is invalidated. A fetch
// remembers the generation it started in; a response from an older
// generation is stored but never counts as fresh.
//
// Data is type-erased behind `Arc<dyn Any>`; the typed surface lives in
// `query`, `subscribe` and `get_query_data`.

mod key;
mod observer;

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use nurtura_api::{ErrorKind, NormalizedError};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

pub use key::QueryKey;
pub use observer::{QueryObserver, QueryState, QueryStream};

/// Upper bound on the delay between retry attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<AnyData, NormalizedError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;

// ── Options ──────────────────────────────────────────────────────────

/// Per-query freshness and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a successful result counts as fresh. Default: 60s.
    pub stale_time: Duration,
    /// Extra attempts after a retryable failure. Default: 1.
    pub retry: u32,
    /// Delay before the first retry, doubled per attempt. Default: 1s.
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(60),
            retry: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl QueryOptions {
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// `min(retry_delay * 2^attempt, MAX_RETRY_DELAY)`
    fn delay_for(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(MAX_RETRY_DELAY)
    }
}

// ── Entry ────────────────────────────────────────────────────────────

/// What observers see of one entry.
#[derive(Clone)]
pub(crate) struct Snapshot {
    pub(crate) data: Option<AnyData>,
    pub(crate) error: Option<NormalizedError>,
    pub(crate) is_fetching: bool,
    pub(crate) is_invalidated: bool,
    pub(crate) updated_at: Option<Instant>,
    /// Stale time of the fetch that produced `data`.
    pub(crate) stale_time: Duration,
    /// Entry generation `data` was fetched in.
    pub(crate) generation: u64,
}

impl Snapshot {
    fn empty(stale_time: Duration) -> Self {
        Self {
            data: None,
            error: None,
            is_fetching: false,
            is_invalidated: false,
            updated_at: None,
            stale_time,
            generation: 0,
        }
    }

    pub(crate) fn is_fresh(&self, stale_time: Duration, now: Instant) -> bool {
        !self.is_invalidated
            && self.data.is_some()
            && self
                .updated_at
                .is_some_and(|at| now.saturating_duration_since(at) < stale_time)
    }
}

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

pub(crate) struct Entry {
    key: QueryKey,
    state: watch::Sender<Snapshot>,
    in_flight: Mutex<Option<InFlight>>,
    fetcher: Mutex<Option<(Fetcher, QueryOptions)>>,
    observers: AtomicUsize,
    generation: AtomicU64,
}

impl Entry {
    fn new(key: QueryKey, stale_time: Duration) -> Self {
        let (state, _) = watch::channel(Snapshot::empty(stale_time));
        Self {
            key,
            state,
            in_flight: Mutex::new(None),
            fetcher: Mutex::new(None),
            observers: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn key(&self) -> &QueryKey {
        &self.key
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    fn register(&self, fetcher: Fetcher, options: QueryOptions) {
        *lock(&self.fetcher) = Some((fetcher, options));
    }

    pub(crate) fn registered(&self) -> Option<(Fetcher, QueryOptions)> {
        lock(&self.fetcher).clone()
    }

    fn fresh_data(&self, stale_time: Duration) -> Option<AnyData> {
        let snapshot = self.state.borrow();
        if snapshot.is_fresh(stale_time, Instant::now()) {
            snapshot.data.clone()
        } else {
            None
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_in_flight(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    pub(crate) fn add_observer(&self) {
        self.observers.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn remove_observer(&self) {
        self.observers.fetch_sub(1, Ordering::SeqCst);
    }

    fn observer_count(&self) -> usize {
        self.observers.load(Ordering::SeqCst)
    }

    /// Join the fetch in flight for the current generation, or start one
    /// with `fetcher`.
    ///
    /// The fetch is driven on its own task when a tokio runtime is present,
    /// so dropping the returned future never cancels the request.
    pub(crate) fn fetch(self: &Arc<Self>, fetcher: Fetcher, options: QueryOptions) -> SharedFetch {
        let mut slot = lock(&self.in_flight);
        let generation = self.generation();
        if let Some(existing) = slot.as_ref().filter(|f| f.generation == generation) {
            trace!(key = %self.key, "joining in-flight fetch");
            return existing.fetch.clone();
        }

        let weak = Arc::downgrade(self);
        let key = self.key.clone();
        let fut = async move {
            let result = run_with_retry(&key, &fetcher, options).await;
            if let Some(entry) = weak.upgrade() {
                entry.complete(&result, options.stale_time, generation);
            }
            result
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            generation,
            fetch: fut.clone(),
        });
        drop(slot);

        self.state.send_modify(|s| s.is_fetching = true);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let driver = fut.clone();
            handle.spawn(async move {
                let _ = driver.await;
            });
        }
        fut
    }

    fn complete(&self, result: &FetchResult, stale_time: Duration, generation: u64) {
        let still_fetching = {
            let mut slot = lock(&self.in_flight);
            if slot.as_ref().is_some_and(|f| f.generation == generation) {
                *slot = None;
            }
            slot.is_some()
        };

        let current = self.generation();
        if generation != current {
            debug!(key = %self.key, generation, current, "response predates invalidation");
        }

        self.state.send_modify(|s| {
            s.is_fetching = still_fetching;
            match result {
                Ok(data) if s.data.is_none() || generation >= s.generation => {
                    s.data = Some(Arc::clone(data));
                    s.error = None;
                    s.updated_at = Some(Instant::now());
                    s.is_invalidated = generation != current;
                    s.stale_time = stale_time;
                    s.generation = generation;
                }
                Err(err) if generation == current => s.error = Some(err.clone()),
                Ok(_) | Err(_) => {}
            }
        });
    }

    fn store(&self, data: AnyData) {
        let generation = self.generation();
        self.state.send_modify(|s| {
            s.data = Some(data);
            s.error = None;
            s.updated_at = Some(Instant::now());
            s.is_invalidated = false;
            s.generation = generation;
        });
    }

    /// Mark the entry stale. The first invalidation since the last fresh
    /// result opens a new generation; repeats before the refetch lands
    /// change nothing.
    fn mark_invalidated(&self) {
        self.state.send_if_modified(|s| {
            if s.is_invalidated {
                return false;
            }
            s.is_invalidated = true;
            self.generation.fetch_add(1, Ordering::SeqCst);
            true
        });
    }

    fn is_collectable(&self, now: Instant, gc_time: Duration) -> bool {
        if self.observer_count() > 0 || self.is_in_flight() {
            return false;
        }
        let snapshot = self.state.borrow();
        match snapshot.updated_at {
            Some(at) => now.saturating_duration_since(at) >= snapshot.stale_time + gc_time,
            None => true,
        }
    }
}

// ── QueryCache ───────────────────────────────────────────────────────

/// Shared query cache. Cheap to clone; clones address the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: DashMap<QueryKey, Arc<Entry>>,
    defaults: QueryOptions,
    gc_time: Duration,
}

impl QueryCache {
    pub fn new(defaults: QueryOptions, gc_time: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                defaults,
                gc_time,
            }),
        }
    }

    /// Options used by hooks that don't override them.
    pub fn defaults(&self) -> QueryOptions {
        self.inner.defaults
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Return fresh cached data for `key`, or fetch it.
    ///
    /// Concurrent calls for the same key share one request. Retryable
    /// failures are retried `options.retry` times. On failure the previous
    /// data (if any) stays in the cache and the error is returned.
    pub async fn query<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Result<Arc<T>, NormalizedError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, NormalizedError>> + Send + 'static,
    {
        let entry = self.entry(&key);
        let fetcher = erase(fetcher);
        entry.register(Arc::clone(&fetcher), options);

        if let Some(data) = entry.fresh_data(options.stale_time) {
            if let Ok(hit) = data.downcast::<T>() {
                trace!(key = %key, "cache hit");
                return Ok(hit);
            }
        }

        debug!(key = %key, "cache miss, fetching");
        let data = entry.fetch(fetcher, options).await?;
        downcast(data)
    }

    /// Mount an observer on `key`.
    ///
    /// Starts a background fetch when the entry is missing or stale. While
    /// at least one observer is alive, invalidating the key refetches it.
    pub fn subscribe<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> QueryObserver<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, NormalizedError>> + Send + 'static,
    {
        let entry = self.entry(&key);
        let fetcher = erase(fetcher);
        entry.register(Arc::clone(&fetcher), options);

        let observer = QueryObserver::new(Arc::clone(&entry), options);
        if entry.fresh_data(options.stale_time).is_none() {
            spawn_fetch(&entry, fetcher, options);
        }
        observer
    }

    /// Cached data for `key`, fresh or stale, without fetching.
    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entry = self.inner.entries.get(key).map(|e| Arc::clone(e.value()))?;
        let data = entry.state.borrow().data.clone()?;
        data.downcast::<T>().ok()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the data for `key` and mark it fresh. Observers are notified.
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, data: T) {
        let entry = self.entry(&key);
        entry.store(Arc::new(data));
        debug!(key = %key, "cache data set");
    }

    /// Mark every entry under `prefix` stale and refetch the observed ones.
    ///
    /// A fetch that started before the invalidation does not satisfy it:
    /// observed entries get a new request, and its response is the one
    /// that lands fresh. Unobserved entries are refetched lazily on their
    /// next `query`.
    /// Returns the number of matched entries.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let matched = self.matching(prefix);

        for entry in &matched {
            entry.mark_invalidated();
            if entry.observer_count() == 0 {
                continue;
            }
            if let Some((fetcher, options)) = entry.registered() {
                spawn_fetch(entry, fetcher, options);
            }
        }

        debug!(prefix = %prefix, matched = matched.len(), "invalidated");
        matched.len()
    }

    /// Drop every entry under `prefix`. Returns the number removed.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let mut removed = 0;
        self.inner.entries.retain(|key, _| {
            let keep = !key.starts_with(prefix);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Drop everything. Called when the session ends.
    pub fn clear(&self) {
        let count = self.inner.entries.len();
        self.inner.entries.clear();
        debug!(count, "cache cleared");
    }

    /// Drop unobserved entries that have been stale for longer than the
    /// cache's `gc_time`. Returns the number removed.
    pub fn gc(&self) -> usize {
        let now = Instant::now();
        let gc_time = self.inner.gc_time;
        let mut removed = 0;
        self.inner.entries.retain(|_, entry| {
            let collect = entry.is_collectable(now, gc_time);
            if collect {
                removed += 1;
            }
            !collect
        });
        if removed > 0 {
            debug!(removed, "cache gc");
        }
        removed
    }

    // ── Introspection ────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner.entries.iter().map(|e| e.key().clone()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn entry(&self, key: &QueryKey) -> Arc<Entry> {
        let stale_time = self.inner.defaults.stale_time;
        Arc::clone(
            self.inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Entry::new(key.clone(), stale_time)))
                .value(),
        )
    }

    fn matching(&self, prefix: &QueryKey) -> Vec<Arc<Entry>> {
        self.inner
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| Arc::clone(e.value()))
            .collect()
    }
}

// ── Free helpers ─────────────────────────────────────────────────────

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn erase<T, F, Fut>(fetcher: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, NormalizedError>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetcher();
        async move { fut.await.map(|data| Arc::new(data) as AnyData) }.boxed()
    })
}

pub(crate) fn downcast<T: Send + Sync + 'static>(data: AnyData) -> Result<Arc<T>, NormalizedError> {
    data.downcast::<T>().map_err(|_| {
        NormalizedError::new(
            ErrorKind::Unknown,
            "cached data has an unexpected type",
            serde_json::Value::Null,
        )
    })
}

/// Start or join a fetch from synchronous code, logging a failure.
fn spawn_fetch(entry: &Arc<Entry>, fetcher: Fetcher, options: QueryOptions) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        warn!(key = %entry.key, "no tokio runtime, skipping background refetch");
        return;
    };
    let fut = entry.fetch(fetcher, options);
    let key = entry.key.clone();
    handle.spawn(async move {
        if let Err(err) = fut.await {
            warn!(key = %key, error = %err, "background refetch failed");
        }
    });
}

async fn run_with_retry(key: &QueryKey, fetcher: &Fetcher, options: QueryOptions) -> FetchResult {
    let mut attempt: u32 = 0;
    loop {
        match fetcher().await {
            Ok(data) => return Ok(data),
            Err(err) if attempt < options.retry && err.is_retryable() => {
                let delay = options.delay_for(attempt);
                debug!(
                    key = %key,
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "query failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                debug!(key = %key, attempt, error = %err, "query failed");
                return Err(err);
            }
        }
    }
}

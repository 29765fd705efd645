// ── Query observers ──
//
// An observer is the mounted-component side of a cache entry: it keeps the
// entry "observed" (so invalidation refetches it) for as long as it lives,
// and exposes typed snapshots of the entry's state.

use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;
use nurtura_api::{ErrorKind, NormalizedError};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;

use super::{Entry, QueryKey, QueryOptions, Snapshot, downcast};

/// Typed view of one cache entry at a point in time.
pub struct QueryState<T> {
    /// Last successful result, possibly stale.
    pub data: Option<Arc<T>>,
    /// Error of the most recent failed fetch, cleared on success.
    pub error: Option<NormalizedError>,
    pub is_fetching: bool,
    /// Older than the stale window, or invalidated.
    pub is_stale: bool,
    pub updated_at: Option<Instant>,
}

impl<T: Send + Sync + 'static> QueryState<T> {
    fn from_snapshot(snapshot: &Snapshot, stale_time: Duration) -> Self {
        Self {
            data: snapshot
                .data
                .clone()
                .and_then(|data| data.downcast::<T>().ok()),
            error: snapshot.error.clone(),
            is_fetching: snapshot.is_fetching,
            is_stale: !snapshot.is_fresh(stale_time, Instant::now()),
            updated_at: snapshot.updated_at,
        }
    }
}

impl<T> QueryState<T> {
    /// No data yet and a fetch is running.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.is_fetching
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
            updated_at: self.updated_at,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("data", &self.data)
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .field("is_stale", &self.is_stale)
            .finish_non_exhaustive()
    }
}

/// Keeps an entry marked as observed until dropped.
struct ObserverGuard {
    entry: Arc<Entry>,
}

impl ObserverGuard {
    fn new(entry: Arc<Entry>) -> Self {
        entry.add_observer();
        Self { entry }
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.entry.remove_observer();
    }
}

/// A subscription to one query key.
///
/// Dropping the observer unsubscribes. A fetch already running is not
/// aborted.
pub struct QueryObserver<T> {
    guard: ObserverGuard,
    receiver: watch::Receiver<Snapshot>,
    options: QueryOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub(crate) fn new(entry: Arc<Entry>, options: QueryOptions) -> Self {
        let receiver = entry.subscribe();
        Self {
            guard: ObserverGuard::new(entry),
            receiver,
            options,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        self.guard.entry.key()
    }

    /// Current state of the entry.
    pub fn state(&self) -> QueryState<T> {
        QueryState::from_snapshot(&self.receiver.borrow(), self.options.stale_time)
    }

    /// Wait for the next change, returning the new state.
    /// Returns `None` if the entry has been dropped.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.receiver.changed().await.ok()?;
        let snapshot = self.receiver.borrow_and_update().clone();
        Some(QueryState::from_snapshot(&snapshot, self.options.stale_time))
    }

    /// Wait until the entry holds data or an error and is not fetching.
    pub async fn settled(&mut self) -> QueryState<T> {
        let mut state = self.state();
        while state.is_fetching || (state.data.is_none() && state.error.is_none()) {
            match self.changed().await {
                Some(next) => state = next,
                None => break,
            }
        }
        state
    }

    /// Fetch now, ignoring freshness. Joins a fetch already in flight.
    pub async fn refetch(&self) -> Result<Arc<T>, NormalizedError> {
        let entry = &self.guard.entry;
        let Some((fetcher, options)) = entry.registered() else {
            return Err(NormalizedError::new(
                ErrorKind::Unknown,
                "no fetcher registered for this query",
                serde_json::Value::Null,
            ));
        };
        let data = entry.fetch(fetcher, options).await?;
        downcast(data)
    }

    /// Convert into a `Stream` of states, starting with the current one.
    pub fn into_stream(self) -> QueryStream<T> {
        QueryStream {
            stale_time: self.options.stale_time,
            inner: WatchStream::new(self.receiver),
            _guard: self.guard,
            _marker: PhantomData,
        }
    }
}

/// `Stream` adapter over a [`QueryObserver`]. Keeps the entry observed.
pub struct QueryStream<T> {
    inner: WatchStream<Snapshot>,
    stale_time: Duration,
    _guard: ObserverGuard,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Stream for QueryStream<T> {
    type Item = QueryState<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Every field is Unpin, so the whole stream is.
        let this = self.get_mut();
        Pin::new(&mut this.inner)
            .poll_next(cx)
            .map(|next| next.map(|snapshot| QueryState::from_snapshot(&snapshot, this.stale_time)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::super::QueryCache;
    use super::*;

    fn key() -> QueryKey {
        QueryKey::new("analytics").with("overview")
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_loading_then_data() {
        let cache = QueryCache::new(QueryOptions::default(), Duration::from_secs(300));
        let mut observer = cache.subscribe::<u32, _, _>(key(), cache.defaults(), || async {
            Ok::<_, NormalizedError>(42)
        });

        assert!(observer.state().is_loading());
        let state = observer.settled().await;
        assert!(state.is_success());
        assert_eq!(state.data.as_deref(), Some(&42));
        assert!(!state.is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_not_refetched_on_subscribe() {
        let cache = QueryCache::new(QueryOptions::default(), Duration::from_secs(300));
        cache.set_query_data(key(), 1_u32);

        let observer = cache.subscribe::<u32, _, _>(key(), cache.defaults(), || async {
            Ok::<_, NormalizedError>(2)
        });
        let state = observer.state();
        assert!(!state.is_fetching);
        assert_eq!(state.data.as_deref(), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn refetch_ignores_freshness() {
        let cache = QueryCache::new(QueryOptions::default(), Duration::from_secs(300));
        cache.set_query_data(key(), 1_u32);
        let observer = cache.subscribe::<u32, _, _>(key(), cache.defaults(), || async {
            Ok::<_, NormalizedError>(2)
        });

        assert_eq!(*observer.refetch().await.unwrap(), 2);
        assert_eq!(cache.get_query_data::<u32>(&key()).as_deref(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn errors_surface_in_state() {
        let cache = QueryCache::new(QueryOptions::default().retry(0), Duration::from_secs(300));
        let mut observer = cache.subscribe::<u32, _, _>(key(), cache.defaults(), || async {
            Err(NormalizedError::new(
                ErrorKind::Rejected { status: 403 },
                "Forbidden",
                serde_json::Value::Null,
            ))
        });

        let state = observer.settled().await;
        assert!(state.is_error());
        assert_eq!(state.error.unwrap().message(), "Forbidden");
    }

    #[tokio::test(start_paused = true)]
    async fn stream_yields_current_then_updates() {
        let cache = QueryCache::new(QueryOptions::default(), Duration::from_secs(300));
        cache.set_query_data(key(), 1_u32);
        let observer = cache.subscribe::<u32, _, _>(key(), cache.defaults(), || async {
            Ok::<_, NormalizedError>(1)
        });
        let mut stream = observer.into_stream();

        let first = stream.next().await.unwrap();
        assert_eq!(first.data.as_deref(), Some(&1));

        cache.set_query_data(key(), 5_u32);
        let next = stream.next().await.unwrap();
        assert_eq!(next.data.as_deref(), Some(&5));
    }
}

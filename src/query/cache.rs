//! Query cache
//!
//! Process-wide cache of JSON responses keyed by [`QueryKey`]. The cache is a
//! cheaply cloneable handle created by the application root and disposed
//! explicitly; every clone shares the same entries.
//!
//! ## Guarantees
//!
//! - Callers asking for the same key share one in-flight request
//! - A fresh hit returns without touching the network
//! - A stale hit returns cached data and schedules one background refetch
//! - Network and 5xx failures are retried with exponential backoff, 4xx never
//! - Responses apply in request-issue order per key; a slow, older request
//!   never overwrites the result of a newer one
//! - When the last observer of a key goes away before it ever held data,
//!   its in-flight request is aborted and the response discarded; a
//!   background refetch of cached data always completes
//! - Entries are only ever mutated by the cache, under the map lock

use super::key::QueryKey;
use super::retry::RetryPolicy;
use crate::error::{DashboardError, Result};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use uuid::Uuid;

/// Default time a successful response counts as fresh
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// Default time an unobserved entry survives garbage collection
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

/// Outcome of one network attempt
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Correlation id of the request, when the fetcher assigns one
    pub request_id: Option<Uuid>,
    /// Response body or failure
    pub result: Result<Value>,
}

impl Attempt {
    /// Attempt made by request `request_id`
    pub fn new(request_id: Uuid, result: Result<Value>) -> Self {
        Self {
            request_id: Some(request_id),
            result,
        }
    }
}

impl From<Result<Value>> for Attempt {
    fn from(result: Result<Value>) -> Self {
        Self {
            request_id: None,
            result,
        }
    }
}

/// Function producing one network attempt for a key
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Attempt> + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Value>>>>;

/// Wrap an async closure as a [`Fetcher`]
pub fn fetcher<F, Fut>(f: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move || f().map(Attempt::from).boxed())
}

/// Wrap an async closure that reports each attempt's request id
pub fn traced_fetcher<F, Fut>(f: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Attempt> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Cache timing and retry settings
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a successful response is fresh
    pub stale_time: Duration,
    /// How long an unobserved, idle entry is kept
    pub gc_time: Duration,
    /// Retry policy for failed fetches
    pub retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            gc_time: DEFAULT_GC_TIME,
            retry: RetryPolicy::default(),
        }
    }
}

/// Lifecycle status of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched, or the only fetch was abandoned
    Idle,
    /// First fetch in flight, no data yet
    Loading,
    /// Data available
    Success,
    /// Last fetch failed
    Error,
}

/// Point-in-time view of one key, as consumed by views
#[derive(Debug, Clone)]
pub struct QueryState {
    /// Key this state belongs to
    pub key: QueryKey,
    /// Entry status
    pub status: QueryStatus,
    /// Last successful response
    pub data: Option<Arc<Value>>,
    /// Last error, kept until a later request succeeds
    pub error: Option<DashboardError>,
    /// Whether a request is in flight (including background refetches)
    pub is_fetching: bool,
    /// Whether the data is past its freshness window or invalidated
    pub is_stale: bool,
    /// Wall-clock time of the last successful response
    pub updated_at: Option<DateTime<Utc>>,
    /// Correlation id of the request whose response or error is shown
    pub request_id: Option<Uuid>,
}

impl QueryState {
    /// First load in flight and nothing to show yet
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Last fetch failed
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Data available
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// Decode the data into a typed value
    pub fn decode<T: DeserializeOwned>(&self) -> Option<Result<T>> {
        self.data
            .as_ref()
            .map(|data| serde_json::from_value((**data).clone()).map_err(DashboardError::from))
    }
}

/// Counters describing the cache contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries
    pub entries: usize,
    /// Entries with a request in flight
    pub in_flight: usize,
    /// Entries with at least one observer
    pub observed: usize,
}

struct InFlight {
    seq: u64,
    fetch: SharedFetch,
    abort: AbortHandle,
}

struct CacheEntry {
    data: Option<Arc<Value>>,
    error: Option<DashboardError>,
    status: QueryStatus,
    fetched_at: Option<Instant>,
    updated_at: Option<DateTime<Utc>>,
    request_id: Option<Uuid>,
    invalidated: bool,
    /// Sequence number of the request (or write) whose result is shown
    applied_seq: u64,
    in_flight: Option<InFlight>,
    observers: usize,
    last_used: Instant,
    fetcher: Option<Fetcher>,
}

impl CacheEntry {
    fn new(now: Instant, floor_seq: u64) -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            fetched_at: None,
            updated_at: None,
            request_id: None,
            invalidated: false,
            applied_seq: floor_seq,
            in_flight: None,
            observers: 0,
            last_used: now,
            fetcher: None,
        }
    }

    fn is_stale(&self, now: Instant, stale_time: Duration) -> bool {
        self.invalidated
            || self
                .fetched_at
                .map_or(true, |at| now.saturating_duration_since(at) >= stale_time)
    }

    fn to_state(&self, key: &QueryKey, now: Instant, stale_time: Duration) -> QueryState {
        QueryState {
            key: key.clone(),
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.in_flight.is_some(),
            is_stale: self.is_stale(now, stale_time),
            updated_at: self.updated_at,
            request_id: self.request_id,
        }
    }
}

/// Pre-mutation copy of one entry, used to roll back optimistic writes
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    key: QueryKey,
    existed: bool,
    data: Option<Arc<Value>>,
    error: Option<DashboardError>,
    status: QueryStatus,
    fetched_at: Option<Instant>,
    updated_at: Option<DateTime<Utc>>,
    request_id: Option<Uuid>,
    invalidated: bool,
}

impl EntrySnapshot {
    /// Key the snapshot was taken for
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Data at snapshot time
    pub fn data(&self) -> Option<&Arc<Value>> {
        self.data.as_ref()
    }
}

struct CacheInner {
    config: CacheConfig,
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    next_seq: AtomicU64,
    disposed: AtomicBool,
    gc_task: Mutex<Option<JoinHandle<()>>>,
}

/// Shared query cache handle
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    /// Create a cache with the given settings
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                config,
                entries: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
                gc_task: Mutex::new(None),
            }),
        }
    }

    /// Cache settings
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get data for `key`, fetching it if needed.
    ///
    /// Fresh data returns at once. Stale data returns at once and triggers
    /// one background refetch. Without data the caller waits for the shared
    /// in-flight request, starting one if none exists.
    pub async fn fetch(&self, key: &QueryKey, fetcher: Fetcher) -> Result<Arc<Value>> {
        self.ensure_live()?;

        let now = Instant::now();
        let pending = {
            let mut entries = self.inner.entries.lock();
            let entry = self.entry_mut(&mut entries, key, now);
            entry.last_used = now;
            entry.fetcher = Some(fetcher.clone());

            let stale = entry.is_stale(now, self.inner.config.stale_time);
            match entry.data.clone() {
                Some(data) if !stale => {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(data);
                }
                Some(data) => {
                    if entry.in_flight.is_none() {
                        tracing::debug!(key = %key, "stale hit, revalidating in background");
                        let _ = self.start_fetch(key, entry, fetcher);
                    }
                    return Ok(data);
                }
                None => match entry.in_flight.as_ref().map(|f| f.fetch.clone()) {
                    Some(joined) => {
                        tracing::debug!(key = %key, "joining in-flight request");
                        joined
                    }
                    None => {
                        tracing::debug!(key = %key, "cache miss");
                        self.start_fetch(key, entry, fetcher)
                    }
                },
            }
        };

        pending.await
    }

    /// Typed variant of [`fetch`](Self::fetch)
    pub async fn fetch_as<T: DeserializeOwned>(&self, key: &QueryKey, fetcher: Fetcher) -> Result<T> {
        let data = self.fetch(key, fetcher).await?;
        Ok(serde_json::from_value((*data).clone())?)
    }

    /// Issue a new request for `key` even if data is fresh or a request is
    /// already in flight, and wait for it.
    pub async fn refetch(&self, key: &QueryKey, fetcher: Fetcher) -> Result<Arc<Value>> {
        self.ensure_live()?;

        let pending = {
            let now = Instant::now();
            let mut entries = self.inner.entries.lock();
            let entry = self.entry_mut(&mut entries, key, now);
            entry.last_used = now;
            entry.fetcher = Some(fetcher.clone());
            self.start_fetch(key, entry, fetcher)
        };

        pending.await
    }

    /// Current state of `key` without fetching
    pub fn state(&self, key: &QueryKey) -> QueryState {
        let now = Instant::now();
        let entries = self.inner.entries.lock();
        match entries.get(key) {
            Some(entry) => entry.to_state(key, now, self.inner.config.stale_time),
            None => QueryState {
                key: key.clone(),
                status: QueryStatus::Idle,
                data: None,
                error: None,
                is_fetching: false,
                is_stale: true,
                updated_at: None,
                request_id: None,
            },
        }
    }

    /// Cached data for `key`, fresh or not
    pub fn get_data(&self, key: &QueryKey) -> Option<Arc<Value>> {
        self.inner
            .entries
            .lock()
            .get(key)
            .and_then(|entry| entry.data.clone())
    }

    /// Register an observer for `key`; the returned guard releases it on drop
    pub fn observe(&self, key: &QueryKey) -> QueryObserver {
        {
            let now = Instant::now();
            let mut entries = self.inner.entries.lock();
            let entry = self.entry_mut(&mut entries, key, now);
            entry.observers += 1;
            entry.last_used = now;
        }

        QueryObserver {
            cache: self.clone(),
            key: key.clone(),
        }
    }

    /// Mark `key` stale. Observed keys with a known fetcher refetch in the background.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.inner.entries.lock();
        match entries.get_mut(key) {
            Some(entry) => {
                self.invalidate_entry(key, entry);
                true
            }
            None => false,
        }
    }

    /// Mark every key matching `predicate` stale; returns how many matched
    pub fn invalidate_where(&self, mut predicate: impl FnMut(&QueryKey) -> bool) -> usize {
        let mut entries = self.inner.entries.lock();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if predicate(key) {
                self.invalidate_entry(key, entry);
                count += 1;
            }
        }
        count
    }

    /// Write data for `key` directly, superseding any in-flight request
    pub fn set_data(&self, key: &QueryKey, value: Value) {
        let now = Instant::now();
        let mut entries = self.inner.entries.lock();
        let entry = self.entry_mut(&mut entries, key, now);
        entry.applied_seq = self.next_seq();
        entry.data = Some(Arc::new(value));
        entry.error = None;
        entry.status = QueryStatus::Success;
        entry.fetched_at = Some(now);
        entry.updated_at = Some(Utc::now());
        entry.request_id = None;
        entry.invalidated = false;
        entry.last_used = now;
    }

    /// Replace cached data with `patch(data)`; no-op without data
    pub fn update_data(&self, key: &QueryKey, patch: impl FnOnce(&Value) -> Value) -> bool {
        match self.get_data(key) {
            Some(current) => {
                self.set_data(key, patch(&current));
                true
            }
            None => false,
        }
    }

    /// Drop `key`, aborting its in-flight request
    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.inner.entries.lock().remove(key);
        match removed {
            Some(entry) => {
                if let Some(in_flight) = entry.in_flight {
                    in_flight.abort.abort();
                }
                true
            }
            None => false,
        }
    }

    /// Copy the entry for `key` so it can be restored later
    pub fn snapshot(&self, key: &QueryKey) -> EntrySnapshot {
        let entries = self.inner.entries.lock();
        match entries.get(key) {
            Some(entry) => EntrySnapshot {
                key: key.clone(),
                existed: true,
                data: entry.data.clone(),
                error: entry.error.clone(),
                status: entry.status,
                fetched_at: entry.fetched_at,
                updated_at: entry.updated_at,
                request_id: entry.request_id,
                invalidated: entry.invalidated,
            },
            None => EntrySnapshot {
                key: key.clone(),
                existed: false,
                data: None,
                error: None,
                status: QueryStatus::Idle,
                fetched_at: None,
                updated_at: None,
                request_id: None,
                invalidated: false,
            },
        }
    }

    /// Put an entry back exactly as it was when `snapshot` was taken
    pub fn restore(&self, snapshot: EntrySnapshot) {
        if !snapshot.existed {
            self.remove(&snapshot.key);
            return;
        }

        let now = Instant::now();
        let mut entries = self.inner.entries.lock();
        let entry = self.entry_mut(&mut entries, &snapshot.key, now);
        entry.applied_seq = self.next_seq();
        entry.data = snapshot.data;
        entry.error = snapshot.error;
        entry.status = snapshot.status;
        entry.fetched_at = snapshot.fetched_at;
        entry.updated_at = snapshot.updated_at;
        entry.request_id = snapshot.request_id;
        entry.invalidated = snapshot.invalidated;
    }

    /// Remove unobserved, idle entries unused for longer than the GC time
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let gc_time = self.inner.config.gc_time;
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.observers > 0
                || entry.in_flight.is_some()
                || now.saturating_duration_since(entry.last_used) < gc_time
        });
        before - entries.len()
    }

    /// Run [`collect_garbage`](Self::collect_garbage) every `interval` until disposed
    pub fn spawn_gc(&self, interval: Duration) {
        let weak: Weak<CacheInner> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let removed = QueryCache { inner }.collect_garbage();
                if removed > 0 {
                    tracing::debug!(removed, "garbage-collected cache entries");
                }
            }
        });

        if let Some(previous) = self.inner.gc_task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Tear the cache down: abort all requests and the GC task, drop all entries.
    ///
    /// Later fetches fail with [`DashboardError::Cancelled`].
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        if let Some(gc) = self.inner.gc_task.lock().take() {
            gc.abort();
        }

        let drained: Vec<CacheEntry> = self.inner.entries.lock().drain().map(|(_, e)| e).collect();
        for entry in drained {
            if let Some(in_flight) = entry.in_flight {
                in_flight.abort.abort();
            }
        }
        tracing::debug!("query cache disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Entry counters
    pub fn stats(&self) -> CacheStats {
        let entries = self.inner.entries.lock();
        CacheStats {
            entries: entries.len(),
            in_flight: entries.values().filter(|e| e.in_flight.is_some()).count(),
            observed: entries.values().filter(|e| e.observers > 0).count(),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(DashboardError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn next_seq(&self) -> u64 {
        self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Entry for `key`, created on first use. New entries ignore every
    /// request issued before they existed.
    fn entry_mut<'a>(
        &self,
        entries: &'a mut HashMap<QueryKey, CacheEntry>,
        key: &QueryKey,
        now: Instant,
    ) -> &'a mut CacheEntry {
        let floor = self.inner.next_seq.load(Ordering::SeqCst);
        entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(now, floor))
    }

    fn invalidate_entry(&self, key: &QueryKey, entry: &mut CacheEntry) {
        entry.invalidated = true;
        if entry.observers == 0 || entry.in_flight.is_some() {
            return;
        }
        let Some(fetcher) = entry.fetcher.clone() else {
            return;
        };
        if tokio::runtime::Handle::try_current().is_ok() {
            tracing::debug!(key = %key, "refetching invalidated query");
            let _ = self.start_fetch(key, entry, fetcher);
        }
    }

    /// Spawn a request for `key` and record it as the entry's in-flight request
    fn start_fetch(&self, key: &QueryKey, entry: &mut CacheEntry, fetcher: Fetcher) -> SharedFetch {
        let seq = self.next_seq();
        let weak = Arc::downgrade(&self.inner);
        let task_key = key.clone();
        let retry = self.inner.config.retry;

        let handle: JoinHandle<Result<Arc<Value>>> = tokio::spawn(async move {
            let attempt = run_with_retry(&task_key, &fetcher, &retry).await;
            let result = attempt.result.map(Arc::new);
            if let Some(inner) = weak.upgrade() {
                QueryCache { inner }.complete(&task_key, seq, attempt.request_id, &result);
            }
            result
        });
        let abort = handle.abort_handle();

        let fetch: SharedFetch = async move {
            match handle.await {
                Ok(result) => result,
                Err(_) => Err(DashboardError::Cancelled),
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            seq,
            fetch: fetch.clone(),
            abort,
        });
        if entry.data.is_none() {
            entry.status = QueryStatus::Loading;
        }
        fetch
    }

    /// Apply the result of request `seq` unless a later-issued request or
    /// write has already been applied
    fn complete(&self, key: &QueryKey, seq: u64, request_id: Option<Uuid>, result: &Result<Arc<Value>>) {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            tracing::debug!(key = %key, seq, "entry gone, discarding response");
            return;
        };

        if entry.in_flight.as_ref().is_some_and(|f| f.seq == seq) {
            entry.in_flight = None;
        }

        if seq <= entry.applied_seq {
            tracing::debug!(
                key = %key,
                seq,
                applied = entry.applied_seq,
                "discarding response superseded by a later request"
            );
            return;
        }
        entry.applied_seq = seq;
        entry.request_id = request_id;

        match result {
            Ok(data) => {
                entry.data = Some(Arc::clone(data));
                entry.error = None;
                entry.status = QueryStatus::Success;
                entry.fetched_at = Some(Instant::now());
                entry.updated_at = Some(Utc::now());
                entry.invalidated = false;
            }
            Err(error) => {
                entry.error = Some(error.clone());
                entry.status = QueryStatus::Error;
            }
        }
    }

    fn release(&self, key: &QueryKey) {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        entry.observers = entry.observers.saturating_sub(1);
        entry.last_used = Instant::now();
        if entry.observers > 0 {
            return;
        }

        // A revalidation of data already on screen runs to completion
        if entry.data.is_some() {
            return;
        }
        if let Some(in_flight) = entry.in_flight.take() {
            tracing::debug!(key = %key, seq = in_flight.seq, "last observer gone, abandoning request");
            in_flight.abort.abort();
            if entry.status == QueryStatus::Loading {
                entry.status = if entry.error.is_some() {
                    QueryStatus::Error
                } else {
                    QueryStatus::Idle
                };
            }
        }
    }
}

/// Guard counting one consumer of a key
#[derive(Debug)]
pub struct QueryObserver {
    cache: QueryCache,
    key: QueryKey,
}

impl QueryObserver {
    /// Observed key
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state of the observed key
    pub fn state(&self) -> QueryState {
        self.cache.state(&self.key)
    }
}

impl Drop for QueryObserver {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

/// Run `fetcher`, retrying transient failures per `policy`. Returns the last attempt.
async fn run_with_retry(key: &QueryKey, fetcher: &Fetcher, policy: &RetryPolicy) -> Attempt {
    let mut retries = 0;
    loop {
        let attempt = fetcher().await;
        let request_id = attempt.request_id.map(tracing::field::display);
        match &attempt.result {
            Ok(_) => return attempt,
            Err(e) if policy.should_retry(e, retries) => {
                retries += 1;
                let delay = policy.delay_for(retries);
                tracing::warn!(
                    key = %key,
                    request_id,
                    attempt = retries,
                    max_retries = policy.max_retries,
                    error = %e,
                    "fetch failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(key = %key, request_id, error = %e, "fetch failed");
                return attempt;
            }
        }
    }
}

//! Query result cache.
//!
//! Entries are keyed by resource name plus the canonical JSON of the read
//! parameters. A fresh entry is served without a request; a stale or
//! invalidated one triggers a fetch, and concurrent readers of the same key
//! await one shared in-flight request.
//!
//! An entry nobody has read for its staleness window plus the cache's
//! garbage-collection time is dropped on the next fetch.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{ApiFailure, ApiResult};

/// Type-erased cached value; [`super::Query`] downcasts it back.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, ApiResult<CachedValue>>>;

pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(300);

/// Cache key: resource name and canonical parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    resource: String,
    params: String,
}

impl QueryKey {
    pub fn new<P: Serialize + ?Sized>(resource: &str, params: &P) -> Self {
        // serde_json maps are ordered, so equal parameters render identically.
        let params = serde_json::to_value(params)
            .map(|v| v.to_string())
            .unwrap_or_else(|e| {
                tracing::warn!(resource, error = %e, "Unserializable query params");
                String::from("null")
            });
        Self {
            resource: resource.to_string(),
            params,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn params(&self) -> &str {
        &self.params
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.resource, self.params)
    }
}

/// Lifecycle of a cache entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStatus {
    #[default]
    Idle,
    Fetching,
    Success,
    Error,
}

#[derive(Default)]
struct Entry {
    data: Option<CachedValue>,
    fetched_at: Option<Instant>,
    status: QueryStatus,
    error: Option<ApiFailure>,
    invalidated: bool,
    in_flight: Option<SharedFetch>,
    stale_time: Duration,
    last_used: Option<Instant>,
}

impl Entry {
    fn touch(&mut self) {
        self.last_used = Some(Instant::now());
    }

    fn expired(&self, gc_time: Duration) -> bool {
        self.in_flight.is_none()
            && self
                .last_used
                .is_some_and(|at| at.elapsed() >= self.stale_time + gc_time)
    }

    fn fresh_data(&self, stale_time: Duration) -> Option<CachedValue> {
        if self.invalidated {
            return None;
        }
        match (&self.data, self.fetched_at) {
            (Some(data), Some(at)) if at.elapsed() < stale_time => Some(data.clone()),
            _ => None,
        }
    }
}

/// Snapshot of one entry, for inspection.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub status: QueryStatus,
    pub has_data: bool,
    pub invalidated: bool,
    pub fetching: bool,
    pub error: Option<ApiFailure>,
}

/// Shared cache handle. Clones observe the same entries.
#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
    gc_time: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_gc_time(DEFAULT_GC_TIME)
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gc_time(gc_time: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            gc_time,
        }
    }

    /// Read `key` through the cache.
    ///
    /// `fetcher` runs only when the entry is stale (or `force` is set) and no
    /// request for the key is already in flight.
    pub async fn fetch<F, Fut>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        force: bool,
        fetcher: F,
    ) -> ApiResult<CachedValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<CachedValue>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock().await;
            Self::evict_expired(&mut entries, self.gc_time, Some(key));
            let entry = entries.entry(key.clone()).or_default();
            entry.stale_time = stale_time;
            entry.touch();

            if !force {
                if let Some(data) = entry.fresh_data(stale_time) {
                    tracing::debug!(%key, "Query cache HIT");
                    return Ok(data);
                }
            }

            match &entry.in_flight {
                Some(shared) => {
                    tracing::debug!(%key, "Query joined in-flight request");
                    shared.clone()
                }
                None => {
                    tracing::debug!(%key, force, "Query cache MISS, fetching");
                    let shared = fetcher().boxed().shared();
                    entry.in_flight = Some(shared.clone());
                    entry.status = QueryStatus::Fetching;
                    shared
                }
            }
        };

        let result = shared.clone().await;
        self.settle(key, &shared, &result).await;
        result
    }

    /// Record the outcome of `shared` unless it was detached meanwhile.
    async fn settle(&self, key: &QueryKey, shared: &SharedFetch, result: &ApiResult<CachedValue>) {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        let current = entry
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.ptr_eq(shared));
        if !current {
            return;
        }

        entry.in_flight = None;
        entry.touch();
        match result {
            Ok(data) => {
                entry.data = Some(data.clone());
                entry.fetched_at = Some(Instant::now());
                entry.status = QueryStatus::Success;
                entry.error = None;
                entry.invalidated = false;
            }
            Err(failure) => {
                entry.status = QueryStatus::Error;
                entry.error = Some(failure.clone());
            }
        }
    }

    /// Last fetched value regardless of freshness.
    pub async fn peek(&self, key: &QueryKey) -> Option<CachedValue> {
        self.entries.lock().await.get(key)?.data.clone()
    }

    pub async fn is_fresh(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.entries
            .lock()
            .await
            .get(key)
            .is_some_and(|entry| entry.fresh_data(stale_time).is_some())
    }

    pub async fn info(&self, key: &QueryKey) -> Option<EntryInfo> {
        let entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        Some(EntryInfo {
            status: entry.status,
            has_data: entry.data.is_some(),
            invalidated: entry.invalidated,
            fetching: entry.in_flight.is_some(),
            error: entry.error.clone(),
        })
    }

    /// Replace the cached value for `key`, marking it freshly fetched.
    pub async fn set_data(&self, key: &QueryKey, data: CachedValue) {
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(key.clone()).or_default();
        entry.data = Some(data);
        entry.fetched_at = Some(Instant::now());
        entry.status = QueryStatus::Success;
        entry.error = None;
        entry.invalidated = false;
        entry.in_flight = None;
        entry.touch();
    }

    /// Mark one key stale and detach its in-flight request.
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                entry.in_flight = None;
                true
            }
            None => false,
        }
    }

    /// Mark every key of `resource` stale. Returns how many entries were touched.
    pub async fn invalidate_resource(&self, resource: &str) -> usize {
        let mut entries = self.entries.lock().await;
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.resource == resource {
                entry.invalidated = true;
                entry.in_flight = None;
                count += 1;
            }
        }
        tracing::debug!(resource, count, "Invalidated queries");
        count
    }

    /// Drop idle entries past their staleness window plus the GC time.
    pub async fn evict(&self) -> usize {
        let mut entries = self.entries.lock().await;
        Self::evict_expired(&mut entries, self.gc_time, None)
    }

    fn evict_expired(
        entries: &mut HashMap<QueryKey, Entry>,
        gc_time: Duration,
        keep: Option<&QueryKey>,
    ) -> usize {
        let before = entries.len();
        entries.retain(|key, entry| Some(key) == keep || !entry.expired(gc_time));
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle queries");
        }
        evicted
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("gc_time", &self.gc_time)
            .finish_non_exhaustive()
    }
}

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tokio::sync::watch;

use super::cache::{CachedValue, QueryCache, QueryKey, QueryStatus};
use crate::error::{ApiFailure, ApiResult};

type Fetcher<P, T> = Arc<dyn Fn(P) -> BoxFuture<'static, ApiResult<T>> + Send + Sync>;

/// What a reader of a query currently sees.
#[derive(Debug)]
pub struct QueryState<T> {
    pub key: QueryKey,
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    pub error: Option<ApiFailure>,
    /// `data` belongs to the previous parameters and is shown while the
    /// current ones load.
    pub is_placeholder_data: bool,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
            is_placeholder_data: self.is_placeholder_data,
        }
    }
}

impl<T> QueryState<T> {
    fn idle(key: QueryKey) -> Self {
        Self {
            key,
            data: None,
            status: QueryStatus::Idle,
            error: None,
            is_placeholder_data: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Fetching && self.data.is_none()
    }

    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Fetching
    }

    /// The loaded data, or the failure that replaced it.
    pub fn into_result(self) -> ApiResult<Arc<T>> {
        match (self.error, self.data) {
            (Some(err), _) => Err(err),
            (None, Some(data)) => Ok(data),
            (None, None) => Err(ApiFailure::local(format!("{} has not been loaded", self.key))),
        }
    }
}

/// Read handle for one resource, bound to its current parameters.
pub struct Query<P, T> {
    resource: &'static str,
    cache: QueryCache,
    fetcher: Fetcher<P, T>,
    stale_time: Duration,
    keep_previous_data: bool,
    params: P,
    state: watch::Sender<QueryState<T>>,
}

impl<P, T> Query<P, T>
where
    P: Serialize + Clone + PartialEq + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new<F, Fut>(
        cache: QueryCache,
        resource: &'static str,
        params: P,
        stale_time: Duration,
        fetcher: F,
    ) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let key = QueryKey::new(resource, &params);
        let (state, _rx) = watch::channel(QueryState::idle(key));
        Self {
            resource,
            cache,
            fetcher: Arc::new(move |p| fetcher(p).boxed()),
            stale_time,
            keep_previous_data: false,
            params,
            state,
        }
    }

    /// Keep showing the last data while a new parameter set loads.
    pub fn keep_previous_data(mut self) -> Self {
        self.keep_previous_data = true;
        self
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::new(self.resource, &self.params)
    }

    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.state.borrow().data.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    /// Switch to new parameters and load them. Unchanged parameters only
    /// re-read through the cache.
    pub async fn set_params(&mut self, params: P) -> QueryState<T> {
        if params != self.params {
            self.params = params;
            let key = self.key();
            let previous = self.state.borrow().data.clone();
            let cached = self.cached(&key).await;

            let next = match (cached, previous) {
                (Some(data), _) => QueryState {
                    data: Some(data),
                    ..QueryState::idle(key)
                },
                (None, Some(previous)) if self.keep_previous_data => QueryState {
                    data: Some(previous),
                    is_placeholder_data: true,
                    ..QueryState::idle(key)
                },
                (None, _) => QueryState::idle(key),
            };
            self.state.send_replace(next);
        }
        self.fetch().await
    }

    /// Read through the cache.
    pub async fn fetch(&self) -> QueryState<T> {
        self.load(false).await
    }

    /// Fetch even if the cached entry is fresh.
    pub async fn refetch(&self) -> QueryState<T> {
        self.load(true).await
    }

    async fn load(&self, force: bool) -> QueryState<T> {
        let key = self.key();

        if force || !self.cache.is_fresh(&key, self.stale_time).await {
            self.state.send_modify(|state| {
                state.status = QueryStatus::Fetching;
                state.error = None;
            });
        }

        let fetcher = self.fetcher.clone();
        let params = self.params.clone();
        let result = self
            .cache
            .fetch(&key, self.stale_time, force, move || async move {
                fetcher(params).await.map(|value| Arc::new(value) as CachedValue)
            })
            .await
            .and_then(downcast::<T>);

        let next = match result {
            Ok(data) => QueryState {
                data: Some(data),
                status: QueryStatus::Success,
                ..QueryState::idle(key)
            },
            Err(failure) => {
                let current = self.state.borrow().clone();
                QueryState {
                    status: QueryStatus::Error,
                    error: Some(failure),
                    ..current
                }
            }
        };

        self.state.send_replace(next.clone());
        next
    }

    async fn cached(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.cache.peek(key).await.and_then(|v| downcast::<T>(v).ok())
    }
}

fn downcast<T: Send + Sync + 'static>(value: CachedValue) -> ApiResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| ApiFailure::local("Cached value has an unexpected type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{oneshot, Mutex};

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Page {
        page: u32,
    }

    fn page_query(cache: QueryCache, calls: Arc<AtomicUsize>) -> Query<Page, Vec<String>> {
        Query::new(cache, "voice-messages", Page { page: 1 }, Duration::from_secs(120), move |p: Page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(vec![format!("message-{}", p.page)]) }
        })
    }

    #[tokio::test]
    async fn test_fetch_populates_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = page_query(QueryCache::new(), calls.clone());
        assert_eq!(query.state().status, QueryStatus::Idle);

        let state = query.fetch().await;
        assert_eq!(state.status, QueryStatus::Success);
        assert_eq!(state.data.unwrap().as_slice(), ["message-1"]);

        query.fetch().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        query.refetch().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_param_change_refetches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut query = page_query(QueryCache::new(), calls.clone());
        query.fetch().await;

        let state = query.set_params(Page { page: 2 }).await;
        assert_eq!(state.data.unwrap().as_slice(), ["message-2"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Back to page one is served from cache.
        let state = query.set_params(Page { page: 1 }).await;
        assert_eq!(state.data.unwrap().as_slice(), ["message-1"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_previous_page_visible_while_loading() {
        let gates: Arc<Mutex<Vec<oneshot::Receiver<()>>>> = Arc::new(Mutex::new(Vec::new()));
        let fetch_gates = gates.clone();
        let mut query = Query::new(
            QueryCache::new(),
            "voice-messages",
            Page { page: 1 },
            Duration::from_secs(120),
            move |p: Page| {
                let gates = fetch_gates.clone();
                async move {
                    if p.page > 1 {
                        let gate = gates.lock().await.pop();
                        if let Some(gate) = gate {
                            let _ = gate.await;
                        }
                    }
                    Ok(p.page)
                }
            },
        )
        .keep_previous_data();

        query.fetch().await;
        let mut rx = query.subscribe();

        let (release, gate) = oneshot::channel();
        gates.lock().await.push(gate);

        let observer = tokio::spawn(async move {
            rx.wait_for(|state| state.is_fetching()).await.unwrap().clone()
        });
        let loader = tokio::spawn(async move { query.set_params(Page { page: 2 }).await });

        let loading = observer.await.unwrap();
        assert!(loading.is_placeholder_data);
        assert_eq!(loading.data.as_deref(), Some(&1));
        assert!(!loading.is_loading());

        release.send(()).unwrap();
        let done = loader.await.unwrap();
        assert_eq!(done.data.as_deref(), Some(&2));
        assert!(!done.is_placeholder_data);
    }

    #[tokio::test]
    async fn test_error_keeps_data() {
        let failing = Arc::new(AtomicUsize::new(0));
        let counter = failing.clone();
        let query = Query::new(QueryCache::new(), "profile", (), Duration::from_secs(600), move |_: ()| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok("Ada".to_string())
                } else {
                    Err(ApiFailure::server(500, "boom"))
                }
            }
        });

        query.fetch().await;
        let state = query.refetch().await;
        assert_eq!(state.status, QueryStatus::Error);
        assert_eq!(state.error.as_ref().unwrap().message, "boom");
        assert_eq!(state.data.as_deref().map(String::as_str), Some("Ada"));
        assert_eq!(state.into_result().unwrap_err().status, Some(500));
    }

    #[tokio::test]
    async fn test_into_result_before_fetch() {
        let query = page_query(QueryCache::new(), Arc::new(AtomicUsize::new(0)));
        let err = query.state().into_result().unwrap_err();
        assert!(err.message.contains("voice-messages"));

        let data = query.fetch().await.into_result().unwrap();
        assert_eq!(data.as_slice(), ["message-1"]);
    }
}

use std::future::Future;
use std::sync::Arc;

use super::cache::QueryCache;
use crate::error::ApiResult;
use crate::notify::{Notification, Notifier};

/// How a mutation reports and what it invalidates.
#[derive(Debug, Clone, Copy)]
pub struct MutationSpec {
    /// Resources whose cached reads become stale on success.
    pub invalidates: &'static [&'static str],
    pub success_message: Option<&'static str>,
    /// Shown when the server gives no message of its own.
    pub error_fallback: &'static str,
}

/// Runs mutations with cache invalidation and notifications.
#[derive(Clone)]
pub struct Mutator {
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
}

impl Mutator {
    pub fn new(cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self { cache, notifier }
    }

    pub async fn run<T, Fut>(&self, spec: &MutationSpec, mutation: Fut) -> ApiResult<T>
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        match mutation.await {
            Ok(value) => {
                for resource in spec.invalidates {
                    self.cache.invalidate_resource(resource).await;
                }
                if let Some(message) = spec.success_message {
                    self.notifier.notify(Notification::success(message));
                }
                Ok(value)
            }
            Err(failure) => {
                let message = failure.server_message().unwrap_or(spec.error_fallback);
                tracing::warn!(error = %failure, "Mutation failed");
                self.notifier.notify(Notification::error(message));
                Err(failure)
            }
        }
    }
}

impl std::fmt::Debug for Mutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiFailure;
    use crate::notify::{ChannelNotifier, NotificationKind};
    use crate::query::{CachedValue, QueryKey};
    use std::time::Duration;

    const ARCHIVE: MutationSpec = MutationSpec {
        invalidates: &["voice-messages"],
        success_message: Some("Response saved"),
        error_fallback: "Failed to save response",
    };

    #[tokio::test]
    async fn test_success_invalidates_and_notifies() {
        let cache = QueryCache::new();
        let key = QueryKey::new("voice-messages", &());
        cache.set_data(&key, Arc::new(1_i64) as CachedValue).await;

        let (notifier, mut rx) = ChannelNotifier::new();
        let mutator = Mutator::new(cache.clone(), Arc::new(notifier));

        let result = mutator.run(&ARCHIVE, async { Ok::<_, ApiFailure>(()) }).await;
        assert!(result.is_ok());
        assert!(!cache.is_fresh(&key, Duration::from_secs(60)).await);
        assert_eq!(rx.try_recv().unwrap(), Notification::success("Response saved"));
    }

    #[tokio::test]
    async fn test_failure_uses_server_message() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let mutator = Mutator::new(QueryCache::new(), Arc::new(notifier));

        let result: ApiResult<()> = mutator
            .run(&ARCHIVE, async { Err(ApiFailure::server(409, "Message already archived")) })
            .await;
        assert!(result.is_err());

        let note = rx.try_recv().unwrap();
        assert_eq!(note.kind, NotificationKind::Error);
        assert_eq!(note.message, "Message already archived");
    }

    #[tokio::test]
    async fn test_failure_without_server_message_uses_fallback() {
        let cache = QueryCache::new();
        let key = QueryKey::new("voice-messages", &());
        cache.set_data(&key, Arc::new(1_i64) as CachedValue).await;

        let (notifier, mut rx) = ChannelNotifier::new();
        let mutator = Mutator::new(cache.clone(), Arc::new(notifier));

        let _: ApiResult<()> = mutator
            .run(&ARCHIVE, async { Err(ApiFailure::network("connection reset")) })
            .await;
        assert_eq!(rx.try_recv().unwrap().message, "Failed to save response");
        // Failed mutations leave the cache alone.
        assert!(cache.is_fresh(&key, Duration::from_secs(60)).await);
    }
}

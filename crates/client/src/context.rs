//! Application context.
//!
//! Built once at startup and passed to whatever needs the session, the API
//! or the cache. Clones share state.

use std::sync::Arc;

use crate::api::{AiApi, AuthApi, BillingApi};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::http::ApiClient;
use crate::hydration::HydrationGate;
use crate::notify::{Notifier, TracingNotifier};
use crate::query::{Mutator, QueryCache};
use crate::resources::{Analytics, Profiles, Settings, VoiceMessages};
use crate::session::SessionStore;
use crate::storage::{FileStore, KeyValueStore, UnavailableStore};

#[derive(Clone)]
pub struct AppContext {
    config: Arc<ClientConfig>,
    session: SessionStore,
    api: ApiClient,
    cache: QueryCache,
    mutator: Mutator,
}

impl AppContext {
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> ClientResult<Self> {
        let session = SessionStore::new(storage);
        let api = ApiClient::new(&config.api, session.clone())?;
        let cache = QueryCache::with_gc_time(config.cache.gc_time());
        let mutator = Mutator::new(cache.clone(), notifier);

        tracing::debug!(base_url = %api.base_url(), "Client context created");

        Ok(Self {
            config: Arc::new(config),
            session,
            api,
            cache,
            mutator,
        })
    }

    /// File-backed storage in the configured directory, logging notifier.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        Self::from_config_with(config, Arc::new(TracingNotifier))
    }

    pub fn from_config_with(config: ClientConfig, notifier: Arc<dyn Notifier>) -> ClientResult<Self> {
        let storage: Arc<dyn KeyValueStore> = match config.storage.resolved_dir() {
            Some(dir) => Arc::new(FileStore::new(dir)),
            None => {
                tracing::warn!("No storage directory available, session will not persist");
                Arc::new(UnavailableStore)
            }
        };
        Self::new(config, storage, notifier)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn hydration_gate(&self) -> HydrationGate {
        HydrationGate::new(self.session.clone())
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.api.clone(), self.cache.clone())
    }

    pub fn ai(&self) -> AiApi {
        AiApi::new(self.api.clone())
    }

    pub fn billing(&self) -> BillingApi {
        BillingApi::new(self.api.clone(), self.config.payments.clone())
    }

    pub fn voice_messages(&self) -> VoiceMessages {
        VoiceMessages::new(
            self.api.clone(),
            self.cache.clone(),
            self.mutator.clone(),
            self.config.cache.voice_messages(),
        )
    }

    pub fn analytics(&self) -> Analytics {
        Analytics::new(
            self.api.clone(),
            self.cache.clone(),
            self.config.cache.analytics(),
        )
    }

    pub fn profile(&self) -> Profiles {
        Profiles::new(
            self.api.clone(),
            self.cache.clone(),
            self.mutator.clone(),
            self.config.cache.profile(),
        )
    }

    pub fn settings(&self) -> Settings {
        Settings::new(
            self.api.clone(),
            self.cache.clone(),
            self.mutator.clone(),
            self.config.cache.settings(),
        )
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("base_url", &self.api.base_url())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::serve;
    use crate::notify::ChannelNotifier;
    use crate::storage::MemoryStore;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    #[tokio::test]
    async fn test_context_wires_shared_session() {
        let router = Router::new()
            .route(
                "/auth/login",
                post(|| async {
                    Json(serde_json::json!({
                        "token": "tok123",
                        "user": {"id": "u1", "email": "a@b.com", "role": "USER"}
                    }))
                }),
            )
            .route(
                "/profile",
                get(|headers: axum::http::HeaderMap| async move {
                    let name = if headers.get("authorization").is_some() { "Ada" } else { "anonymous" };
                    Json(serde_json::json!({
                        "id": "u1",
                        "name": name,
                        "email": "a@b.com"
                    }))
                }),
            );
        let base_url = serve(router).await;

        let mut config = ClientConfig::default();
        config.api.base_url = base_url;
        let storage = Arc::new(MemoryStore::new());
        let (notifier, _rx) = ChannelNotifier::new();
        let ctx = AppContext::new(config, storage.clone(), Arc::new(notifier)).unwrap();

        let mut gate = ctx.hydration_gate();
        gate.mount();
        assert!(!ctx.session().is_authenticated());

        ctx.auth()
            .login(&crate::api::Credentials {
                email: "a@b.com".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();

        let profile = ctx.profile().get().fetch().await.data.unwrap();
        assert_eq!(profile.name, "Ada");

        // A second context over the same storage restores the session.
        let (notifier, _rx) = ChannelNotifier::new();
        let restored = AppContext::new(ctx.config().clone(), storage, Arc::new(notifier)).unwrap();
        assert!(restored.hydration_gate().render(|| false, |s| s.is_authenticated));

        ctx.auth().logout().await;
        assert!(ctx.cache().is_empty().await);
    }
}

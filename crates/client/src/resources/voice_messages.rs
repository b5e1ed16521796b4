//! Voice message inbox, archive and trash.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{segment, Page};
use crate::error::ApiResult;
use crate::http::{ApiClient, RequestOptions};
use crate::query::{MutationSpec, Mutator, Query, QueryCache};

pub const RESOURCE: &str = "voice-messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Processed,
    Responded,
    Archived,
    Trashed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processed => "processed",
            MessageStatus::Responded => "responded",
            MessageStatus::Archived => "archived",
            MessageStatus::Trashed => "trashed",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(MessageStatus::Pending),
            "processed" => Ok(MessageStatus::Processed),
            "responded" => Ok(MessageStatus::Responded),
            "archived" => Ok(MessageStatus::Archived),
            "trashed" => Ok(MessageStatus::Trashed),
            other => Err(format!("unknown message status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMessage {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    pub status: MessageStatus,
    /// Length in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// List parameters; part of the cache key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageFilters {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for MessageFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            status: None,
            search: None,
        }
    }
}

impl MessageFilters {
    pub fn with_status(status: MessageStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }
}

/// Detail parameters; part of the cache key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageId {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVoiceMessage {
    pub title: String,
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMessagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub recipients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub url: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

const CREATE: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE, super::analytics::RESOURCE],
    success_message: Some("Voice message uploaded"),
    error_fallback: "Failed to upload voice message",
};

const UPDATE: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE],
    success_message: Some("Voice message updated"),
    error_fallback: "Failed to update voice message",
};

const RESPOND: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE, super::analytics::RESOURCE],
    success_message: Some("Response saved"),
    error_fallback: "Failed to save response",
};

const ARCHIVE: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE],
    success_message: Some("Voice message archived"),
    error_fallback: "Failed to archive voice message",
};

const RESTORE: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE],
    success_message: Some("Voice message restored"),
    error_fallback: "Failed to restore voice message",
};

const TRASH: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE],
    success_message: Some("Voice message moved to trash"),
    error_fallback: "Failed to delete voice message",
};

const DELETE: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE, super::analytics::RESOURCE],
    success_message: Some("Voice message permanently deleted"),
    error_fallback: "Failed to delete voice message",
};

const SHARE: MutationSpec = MutationSpec {
    invalidates: &[],
    success_message: Some("Share link created"),
    error_fallback: "Failed to share voice message",
};

/// Voice message reads and mutations
#[derive(Debug, Clone)]
pub struct VoiceMessages {
    api: ApiClient,
    cache: QueryCache,
    mutator: Mutator,
    stale_time: Duration,
}

impl VoiceMessages {
    pub fn new(api: ApiClient, cache: QueryCache, mutator: Mutator, stale_time: Duration) -> Self {
        Self {
            api,
            cache,
            mutator,
            stale_time,
        }
    }

    /// `GET /voice-messages`; the previous page stays visible while the next loads.
    pub fn list(&self, filters: MessageFilters) -> Query<MessageFilters, Page<VoiceMessage>> {
        let api = self.api.clone();
        Query::new(self.cache.clone(), RESOURCE, filters, self.stale_time, move |f: MessageFilters| {
            let api = api.clone();
            async move {
                let options = RequestOptions::get()
                    .query("page", f.page)
                    .query("limit", f.limit)
                    .query_opt("status", f.status)
                    .query_opt("search", f.search);
                api.request_data("/voice-messages", options).await
            }
        })
        .keep_previous_data()
    }

    /// `GET /voice-messages/{id}`
    pub fn detail(&self, id: &str) -> Query<MessageId, VoiceMessage> {
        let api = self.api.clone();
        let params = MessageId { id: id.to_string() };
        Query::new(self.cache.clone(), RESOURCE, params, self.stale_time, move |p: MessageId| {
            let api = api.clone();
            async move {
                api.request_data(&format!("/voice-messages/{}", segment(&p.id)), RequestOptions::get())
                    .await
            }
        })
    }

    /// `POST /voice-messages`
    pub async fn create(&self, message: &NewVoiceMessage) -> ApiResult<VoiceMessage> {
        let options = RequestOptions::post().json(message)?;
        self.mutator
            .run(&CREATE, self.api.request_data("/voice-messages", options))
            .await
    }

    /// `PATCH /voice-messages/{id}`
    pub async fn update(&self, id: &str, patch: &VoiceMessagePatch) -> ApiResult<VoiceMessage> {
        let options = RequestOptions::patch().json(patch)?;
        self.mutator
            .run(&UPDATE, self.api.request_data(&item_path(id), options))
            .await
    }

    /// Set the written response for a message.
    pub async fn update_response(&self, id: &str, response: &str) -> ApiResult<VoiceMessage> {
        let patch = VoiceMessagePatch {
            response: Some(response.to_string()),
            status: Some(MessageStatus::Responded),
            ..Default::default()
        };
        let options = RequestOptions::patch().json(&patch)?;
        self.mutator
            .run(&RESPOND, self.api.request_data(&item_path(id), options))
            .await
    }

    /// `POST /voice-messages/{id}/archive`
    pub async fn archive(&self, id: &str) -> ApiResult<()> {
        let endpoint = format!("{}/archive", item_path(id));
        self.mutator
            .run(&ARCHIVE, self.api.request(&endpoint, RequestOptions::post()))
            .await
    }

    /// `POST /voice-messages/{id}/restore`
    pub async fn restore(&self, id: &str) -> ApiResult<()> {
        let endpoint = format!("{}/restore", item_path(id));
        self.mutator
            .run(&RESTORE, self.api.request(&endpoint, RequestOptions::post()))
            .await
    }

    /// `DELETE /voice-messages/{id}` moves the message to trash.
    pub async fn trash(&self, id: &str) -> ApiResult<()> {
        self.mutator
            .run(&TRASH, self.api.request(&item_path(id), RequestOptions::delete()))
            .await
    }

    /// `DELETE /voice-messages/{id}/permanent`
    pub async fn delete_permanently(&self, id: &str) -> ApiResult<()> {
        let endpoint = format!("{}/permanent", item_path(id));
        self.mutator
            .run(&DELETE, self.api.request(&endpoint, RequestOptions::delete()))
            .await
    }

    /// `POST /voice-messages/{id}/share`
    pub async fn share(&self, id: &str, request: &ShareRequest) -> ApiResult<ShareLink> {
        let endpoint = format!("{}/share", item_path(id));
        let options = RequestOptions::post().json(request)?;
        self.mutator
            .run(&SHARE, self.api.request_data(&endpoint, options))
            .await
    }
}

fn item_path(id: &str) -> String {
    format!("/voice-messages/{}", segment(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{client, serve};
    use crate::notify::{ChannelNotifier, NotificationKind};
    use axum::extract::{Path, Query as QueryParams, State};
    use axum::http::StatusCode;
    use axum::routing::{get, patch};
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Backend {
        response: Arc<Mutex<Option<String>>>,
        list_calls: Arc<AtomicUsize>,
    }

    fn message(id: &str, response: Option<String>) -> serde_json::Value {
        let status = if response.is_some() { "responded" } else { "pending" };
        serde_json::json!({
            "id": id,
            "title": "Call back",
            "status": status,
            "response": response,
            "duration": 12.5,
            "createdAt": "2026-10-01T09:30:00Z"
        })
    }

    fn router(backend: Backend) -> Router {
        Router::new()
            .route(
                "/voice-messages",
                get(
                    |State(b): State<Backend>, QueryParams(q): QueryParams<HashMap<String, String>>| async move {
                        b.list_calls.fetch_add(1, Ordering::SeqCst);
                        let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
                        let response = b.response.lock().unwrap().clone();
                        Json(serde_json::json!({
                            "items": [message(&format!("vm-{}", page), response)],
                            "total": 2,
                            "page": page,
                            "limit": q.get("limit").and_then(|l| l.parse::<u32>().ok()).unwrap_or(20)
                        }))
                    },
                ),
            )
            .route(
                "/voice-messages/{id}",
                patch(
                    |State(b): State<Backend>, Path(id): Path<String>, Json(body): Json<serde_json::Value>| async move {
                        if id == "missing" {
                            return (
                                StatusCode::NOT_FOUND,
                                Json(serde_json::json!({"message": "Voice message not found"})),
                            );
                        }
                        let text = body["response"].as_str().map(str::to_string);
                        *b.response.lock().unwrap() = text.clone();
                        (StatusCode::OK, Json(message(&id, text)))
                    },
                )
                .get(|Path(id): Path<String>| async move { Json(message(&id, None)) }),
            )
            .with_state(backend)
    }

    async fn hooks(backend: Backend) -> (VoiceMessages, tokio::sync::mpsc::UnboundedReceiver<crate::notify::Notification>) {
        let api = client(&serve(router(backend)).await);
        let cache = QueryCache::new();
        let (notifier, rx) = ChannelNotifier::new();
        let mutator = Mutator::new(cache.clone(), Arc::new(notifier));
        (
            VoiceMessages::new(api, cache, mutator, Duration::from_secs(120)),
            rx,
        )
    }

    #[tokio::test]
    async fn test_list_is_cached_per_filters() {
        let backend = Backend::default();
        let (messages, _rx) = hooks(backend.clone()).await;

        let mut list = messages.list(MessageFilters::default());
        let state = list.fetch().await;
        let page = state.data.unwrap();
        assert_eq!(page.items[0].id, "vm-1");
        assert_eq!(page.items[0].status, MessageStatus::Pending);

        list.fetch().await;
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 1);

        let next = list.params().next_page();
        let state = list.set_params(next).await;
        assert_eq!(state.data.unwrap().items[0].id, "vm-2");
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_update_response_invalidates_list() {
        let backend = Backend::default();
        let (messages, mut rx) = hooks(backend.clone()).await;

        let list = messages.list(MessageFilters::default());
        let before = list.fetch().await.data.unwrap();
        assert_eq!(before.items[0].response, None);

        let updated = messages.update_response("vm-1", "On my way").await.unwrap();
        assert_eq!(updated.response.as_deref(), Some("On my way"));
        let note = rx.try_recv().unwrap();
        assert_eq!(note.kind, NotificationKind::Success);
        assert_eq!(note.message, "Response saved");

        // Same handle, same key: must not serve the pre-update value.
        let after = list.fetch().await.data.unwrap();
        assert_eq!(after.items[0].response.as_deref(), Some("On my way"));
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_update_notifies_server_message() {
        let (messages, mut rx) = hooks(Backend::default()).await;

        let failure = messages
            .update("missing", &VoiceMessagePatch {
                title: Some("x".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(failure.status, Some(404));

        let note = rx.try_recv().unwrap();
        assert_eq!(note.kind, NotificationKind::Error);
        assert_eq!(note.message, "Voice message not found");
    }

    #[tokio::test]
    async fn test_detail() {
        let (messages, _rx) = hooks(Backend::default()).await;
        let detail = messages.detail("vm-9");
        let state = detail.fetch().await;
        assert_eq!(state.data.unwrap().duration, Some(12.5));
    }

    #[tokio::test]
    async fn test_detail_id_reaches_server_unchanged() {
        let (messages, _rx) = hooks(Backend::default()).await;
        for id in ["a b", "x+y", "q?r"] {
            let state = messages.detail(id).fetch().await;
            assert_eq!(state.data.unwrap().id, id);
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Archived".parse::<MessageStatus>().unwrap(), MessageStatus::Archived);
        assert!("lost".parse::<MessageStatus>().is_err());
        assert_eq!(MessageStatus::Trashed.to_string(), "trashed");
    }

    #[test]
    fn test_filters_key_omits_empty_fields() {
        let json = serde_json::to_value(MessageFilters::with_status(MessageStatus::Archived)).unwrap();
        assert_eq!(json, serde_json::json!({"page": 1, "limit": 20, "status": "archived"}));
    }
}

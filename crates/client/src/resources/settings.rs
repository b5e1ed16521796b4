//! Notification settings and preferences.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::http::{ApiClient, RequestOptions};
use crate::query::{MutationSpec, Mutator, Query, QueryCache};

pub const RESOURCE: &str = "settings";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub push_notifications: bool,
    #[serde(default)]
    pub new_message_alerts: bool,
    #[serde(default)]
    pub weekly_digest: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub language: String,
    pub timezone: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub auto_transcribe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsSection {
    pub section: &'static str,
}

const UPDATE_NOTIFICATIONS: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE],
    success_message: Some("Notification settings saved"),
    error_fallback: "Failed to save notification settings",
};

const UPDATE_PREFERENCES: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE],
    success_message: Some("Preferences saved"),
    error_fallback: "Failed to save preferences",
};

#[derive(Debug, Clone)]
pub struct Settings {
    api: ApiClient,
    cache: QueryCache,
    mutator: Mutator,
    stale_time: Duration,
}

impl Settings {
    pub fn new(api: ApiClient, cache: QueryCache, mutator: Mutator, stale_time: Duration) -> Self {
        Self {
            api,
            cache,
            mutator,
            stale_time,
        }
    }

    /// `GET /settings/notifications`
    pub fn notifications(&self) -> Query<SettingsSection, NotificationSettings> {
        self.section("notifications")
    }

    /// `GET /settings/preferences`
    pub fn preferences(&self) -> Query<SettingsSection, Preferences> {
        self.section("preferences")
    }

    /// `PUT /settings/notifications`
    pub async fn update_notifications(
        &self,
        settings: &NotificationSettings,
    ) -> ApiResult<NotificationSettings> {
        let options = RequestOptions::put().json(settings)?;
        self.mutator
            .run(
                &UPDATE_NOTIFICATIONS,
                self.api.request_data("/settings/notifications", options),
            )
            .await
    }

    /// `PUT /settings/preferences`
    pub async fn update_preferences(&self, preferences: &Preferences) -> ApiResult<Preferences> {
        let options = RequestOptions::put().json(preferences)?;
        self.mutator
            .run(
                &UPDATE_PREFERENCES,
                self.api.request_data("/settings/preferences", options),
            )
            .await
    }

    fn section<T>(&self, section: &'static str) -> Query<SettingsSection, T>
    where
        T: serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        let api = self.api.clone();
        Query::new(
            self.cache.clone(),
            RESOURCE,
            SettingsSection { section },
            self.stale_time,
            move |p: SettingsSection| {
                let api = api.clone();
                async move {
                    api.request_data(&format!("/settings/{}", p.section), RequestOptions::get())
                        .await
                }
            },
        )
    }
}

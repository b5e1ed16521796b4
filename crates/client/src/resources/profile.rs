//! Account profile.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::http::{ApiClient, RequestOptions};
use crate::query::{MutationSpec, Mutator, Query, QueryCache};
use crate::session::UserPatch;

pub const RESOURCE: &str = "profile";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

const UPDATE: MutationSpec = MutationSpec {
    invalidates: &[RESOURCE],
    success_message: Some("Profile updated"),
    error_fallback: "Failed to update profile",
};

#[derive(Debug, Clone)]
pub struct Profiles {
    api: ApiClient,
    cache: QueryCache,
    mutator: Mutator,
    stale_time: Duration,
}

impl Profiles {
    pub fn new(api: ApiClient, cache: QueryCache, mutator: Mutator, stale_time: Duration) -> Self {
        Self {
            api,
            cache,
            mutator,
            stale_time,
        }
    }

    /// `GET /profile`
    pub fn get(&self) -> Query<(), Profile> {
        let api = self.api.clone();
        Query::new(self.cache.clone(), RESOURCE, (), self.stale_time, move |_: ()| {
            let api = api.clone();
            async move { api.request_data("/profile", RequestOptions::get()).await }
        })
    }

    /// `PUT /profile`. The session user picks up the new name, email and company.
    pub async fn update(&self, patch: &ProfilePatch) -> ApiResult<Profile> {
        let options = RequestOptions::put().json(patch)?;
        let profile: Profile = self
            .mutator
            .run(&UPDATE, self.api.request_data("/profile", options))
            .await?;

        self.api.session().update_user(&UserPatch {
            name: Some(profile.name.clone()),
            email: Some(profile.email.clone()),
            company: Some(profile.company.clone()),
            ..Default::default()
        });

        Ok(profile)
    }
}

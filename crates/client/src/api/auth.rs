//! Login, registration and logout.

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::http::{ApiClient, RequestOptions};
use crate::query::QueryCache;
use crate::session::User;

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Body returned by `/auth/login` and `/auth/register`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct AuthApi {
    api: ApiClient,
    cache: QueryCache,
}

impl AuthApi {
    pub fn new(api: ApiClient, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    /// `POST /auth/login`; stores the session on success.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        let options = RequestOptions::post().json(credentials)?;
        let response: AuthResponse = self.api.request_data("/auth/login", options).await?;
        Ok(self.establish(response).await)
    }

    /// `POST /auth/register`; stores the session on success.
    pub async fn register(&self, registration: &Registration) -> ApiResult<User> {
        let options = RequestOptions::post().json(registration)?;
        let response: AuthResponse = self.api.request_data("/auth/register", options).await?;
        Ok(self.establish(response).await)
    }

    /// Drop the session and everything cached on its behalf.
    pub async fn logout(&self) {
        self.api.session().logout();
        self.cache.clear().await;
    }

    async fn establish(&self, response: AuthResponse) -> User {
        // Cached reads belong to whoever was signed in before.
        self.cache.clear().await;
        self.api.session().set_auth(response.token, response.user.clone());
        tracing::info!(user_id = %response.user.id, "Signed in");
        response.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{client, serve};
    use crate::query::{CachedValue, QueryKey};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::Arc;

    fn router() -> Router {
        Router::new()
            .route(
                "/auth/login",
                post(|Json(body): Json<serde_json::Value>| async move {
                    if body["password"] == "secret" {
                        (
                            StatusCode::OK,
                            Json(serde_json::json!({
                                "token": "tok123",
                                "user": {"id": "u1", "name": "Ada", "email": "a@b.com", "role": "USER"}
                            })),
                        )
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(serde_json::json!({"message": "invalid credentials"})),
                        )
                    }
                }),
            )
            .route(
                "/auth/register",
                post(|Json(body): Json<serde_json::Value>| async move {
                    Json(serde_json::json!({
                        "success": true,
                        "data": {
                            "token": "tok-new",
                            "user": {"id": "u2", "name": body["name"], "email": body["email"], "company": body["company"]}
                        }
                    }))
                }),
            )
    }

    #[tokio::test]
    async fn test_login_sets_session_and_clears_cache() {
        let api = client(&serve(router()).await);
        let cache = QueryCache::new();
        cache
            .set_data(&QueryKey::new("profile", &()), Arc::new(1_i64) as CachedValue)
            .await;
        let auth = AuthApi::new(api.clone(), cache.clone());

        let user = auth
            .login(&Credentials {
                email: "a@b.com".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.id, "u1");
        assert!(api.session().is_authenticated());
        assert_eq!(api.session().token().as_deref(), Some("tok123"));
        assert!(cache.is_empty().await);

        auth.logout().await;
        assert!(!api.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_login_failure_leaves_session_empty() {
        let api = client(&serve(router()).await);
        let auth = AuthApi::new(api.clone(), QueryCache::new());

        let failure = auth
            .login(&Credentials {
                email: "a@b.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(failure.message, "invalid credentials");
        assert!(!api.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_register_accepts_wrapped_response() {
        let api = client(&serve(router()).await);
        let auth = AuthApi::new(api.clone(), QueryCache::new());

        let user = auth
            .register(&Registration {
                name: "Grace".to_string(),
                email: "g@h.com".to_string(),
                password: "pw".to_string(),
                company: Some("Navy".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(user.company.as_deref(), Some("Navy"));
        assert_eq!(api.session().token().as_deref(), Some("tok-new"));
    }
}

//! Subscription checkout and status.
//!
//! Checkout is redirect based: the API creates a hosted checkout session and
//! the client sends the browser (or prints a link) to the processor's page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PaymentsConfig;
use crate::error::{ApiFailure, ApiResult};
use crate::http::{ApiClient, RequestOptions};
use crate::result_ext::OptionResultExt;
use crate::session::{SubscriptionTier, UserPatch};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest<'a> {
    price_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionResponse {
    #[serde(alias = "id")]
    session_id: String,
}

/// Where to send the user to complete payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRedirect {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub tier: SubscriptionTier,
    pub status: SubscriptionState,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone)]
pub struct BillingApi {
    api: ApiClient,
    payments: PaymentsConfig,
}

impl BillingApi {
    pub fn new(api: ApiClient, payments: PaymentsConfig) -> Self {
        Self { api, payments }
    }

    /// `POST /stripe/create-checkout-session`, then build the hosted checkout URL.
    pub async fn create_checkout_session(&self, price_id: &str) -> ApiResult<CheckoutRedirect> {
        let options = RequestOptions::post().json(&CheckoutRequest { price_id })?;
        let response: CheckoutSessionResponse = self
            .api
            .request_data("/stripe/create-checkout-session", options)
            .await?;

        let url = self.checkout_url(&response.session_id)?;
        tracing::info!(session_id = %response.session_id, "Checkout session created");
        Ok(CheckoutRedirect {
            session_id: response.session_id,
            url,
        })
    }

    /// `GET /stripe/subscription-status`. A tier change is copied into the session user.
    pub async fn subscription_status(&self) -> ApiResult<SubscriptionStatus> {
        let status: SubscriptionStatus = self
            .api
            .request_data("/stripe/subscription-status", RequestOptions::get())
            .await?;

        let session = self.api.session();
        if let Some(user) = session.user().log_none("subscription status without a session user") {
            if user.subscription_tier != status.tier {
                session.update_user(&UserPatch {
                    subscription_tier: Some(status.tier),
                    ..Default::default()
                });
            }
        }

        Ok(status)
    }

    fn checkout_url(&self, session_id: &str) -> ApiResult<String> {
        let base = self.payments.checkout_base_url.trim_end_matches('/');
        let mut url = url::Url::parse(base)
            .map_err(|e| ApiFailure::local(format!("Invalid checkout URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiFailure::local("Checkout URL cannot take a path"))?
            .push(session_id);
        url.query_pairs_mut()
            .append_pair("key", &self.payments.publishable_key);
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{client, serve};
    use crate::session::{User, UserRole};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    fn payments() -> PaymentsConfig {
        PaymentsConfig {
            publishable_key: "pk_test_123".to_string(),
            checkout_base_url: "https://checkout.example.com/pay/".to_string(),
        }
    }

    #[tokio::test]
    async fn test_checkout_redirect() {
        let router = Router::new().route(
            "/stripe/create-checkout-session",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["priceId"], "price_pro");
                Json(serde_json::json!({ "sessionId": "cs_test_1" }))
            }),
        );
        let billing = BillingApi::new(client(&serve(router).await), payments());

        let redirect = billing.create_checkout_session("price_pro").await.unwrap();
        assert_eq!(redirect.session_id, "cs_test_1");
        assert_eq!(
            redirect.url,
            "https://checkout.example.com/pay/cs_test_1?key=pk_test_123"
        );
    }

    #[tokio::test]
    async fn test_subscription_status_updates_user_tier() {
        let router = Router::new().route(
            "/stripe/subscription-status",
            get(|| async {
                Json(serde_json::json!({
                    "tier": "PRO",
                    "status": "active",
                    "currentPeriodEnd": "2026-11-18T00:00:00Z"
                }))
            }),
        );
        let api = client(&serve(router).await);
        api.session().set_auth(
            "tok",
            User {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                email: "a@b.com".to_string(),
                company: None,
                role: UserRole::User,
                subscription_tier: SubscriptionTier::Free,
            },
        );
        let billing = BillingApi::new(api.clone(), payments());

        let status = billing.subscription_status().await.unwrap();
        assert_eq!(status.status, SubscriptionState::Active);
        assert!(status.current_period_end.is_some());
        assert!(!status.cancel_at_period_end);
        assert_eq!(api.session().user().unwrap().subscription_tier, SubscriptionTier::Pro);
    }
}

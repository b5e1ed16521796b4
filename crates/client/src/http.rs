//! HTTP client wrapper for the Voxmail API.
//!
//! Every call goes through [`ApiClient::request`], which attaches the session
//! token, encodes JSON bodies and folds every outcome (transport failure,
//! error status, undecodable body) into an [`ApiResult`]. Nothing here
//! panics or returns a transport error directly.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{ApiFailure, ApiResult, ClientResult};
use crate::session::SessionStore;

/// Options for a single API request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::with_method(Method::GET)
    }

    pub fn post() -> Self {
        Self::with_method(Method::POST)
    }

    pub fn put() -> Self {
        Self::with_method(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::with_method(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::with_method(Method::DELETE)
    }

    fn with_method(method: Method) -> Self {
        Self {
            method,
            body: None,
            query: Vec::new(),
        }
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
        let value = serde_json::to_value(body).map_err(ApiFailure::encode)?;
        self.body = Some(value);
        Ok(self)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter when present.
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }
}

/// HTTP client bound to the API base URL and the session store
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: SessionStore) -> ClientResult<Self> {
        url::Url::parse(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Send a request and decode the JSON response into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let url = self.url(endpoint);
        let mut req = self.http.request(options.method.clone(), &url);

        if !options.query.is_empty() {
            req = req.query(&options.query);
        }
        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = &options.body {
            req = req.json(body);
        }

        tracing::debug!(method = %options.method, %url, "API request");

        let res = match req.send().await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(method = %options.method, %url, error = %e, "API request failed to send");
                return Err(ApiFailure::network(e));
            }
        };

        let status = res.status().as_u16();
        let body = res.text().await.map_err(ApiFailure::network)?;

        if !(200..300).contains(&status) {
            let failure = parse_error_body(status, &body);
            tracing::debug!(status, message = %failure.message, "API error response");
            return Err(failure);
        }

        decode_success(status, &body)
    }

    /// Like [`request`](Self::request), accepting either a bare body or one
    /// wrapped as `{"data": ...}`.
    pub async fn request_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let envelope: Envelope<T> = self.request(endpoint, options).await?;
        Ok(envelope.into_inner())
    }

    /// `GET /health`
    pub async fn health(&self) -> ApiResult<Value> {
        self.request("/health", RequestOptions::get()).await
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

fn decode_success<T: DeserializeOwned>(status: u16, body: &str) -> ApiResult<T> {
    let decoded = if body.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(body)
    };

    decoded.map_err(|e| {
        tracing::warn!(status, error = %e, "Undecodable API response");
        ApiFailure::invalid_response(status, e)
    })
}

/// Build the failure for a non-2xx response.
pub(crate) fn parse_error_body(status: u16, body: &str) -> ApiFailure {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return ApiFailure::status(status);
    };

    let text = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let failure = match text(map.get("message"))
        .or_else(|| text(map.get("error")))
        .or_else(|| text(map.get("error").and_then(|e| e.get("message"))))
    {
        Some(message) => ApiFailure::server(status, message),
        None => ApiFailure::status(status),
    };
    match map.get("details") {
        Some(details) if !details.is_null() => failure.with_details(details.clone()),
        _ => failure,
    }
}

/// Generic message for an HTTP status.
pub fn status_message(status: u16) -> String {
    match status {
        400 => "Bad request".to_string(),
        401 => "Unauthorized".to_string(),
        403 => "Forbidden".to_string(),
        404 => "Not found".to_string(),
        409 => "Conflict".to_string(),
        422 => "Validation failed".to_string(),
        429 => "Too many requests".to_string(),
        500 => "Internal server error".to_string(),
        502 => "Bad gateway".to_string(),
        503 => "Service unavailable".to_string(),
        _ => format!("Request failed with status {}", status),
    }
}

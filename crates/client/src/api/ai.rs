//! Text processing and assistant chat.

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::http::{ApiClient, RequestOptions};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTextRequest {
    pub text: String,
    /// Free-form instruction such as "summarize" or "draft a reply".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTextResponse {
    #[serde(alias = "result")]
    pub processed_text: String,
    #[serde(default)]
    pub tokens_used: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Voice message the conversation is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(alias = "response")]
    pub reply: String,
}

#[derive(Debug, Clone)]
pub struct AiApi {
    api: ApiClient,
}

impl AiApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `POST /ai/process-text`
    pub async fn process_text(&self, request: &ProcessTextRequest) -> ApiResult<ProcessTextResponse> {
        let options = RequestOptions::post().json(request)?;
        self.api.request_data("/ai/process-text", options).await
    }

    /// `POST /ai/chat`
    pub async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatResponse> {
        let options = RequestOptions::post().json(request)?;
        self.api.request_data("/ai/chat", options).await
    }
}

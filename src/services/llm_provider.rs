use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::LlmConfig;
use crate::services::pdf::Snippet;
use crate::services::prompt::{ChatRequest, PromptTruncation};
use crate::session::Role;

#[derive(Debug, thiserror::Error)]
pub enum RemoteServiceError {
    #[error("Chat request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Chat service returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Malformed chat response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
}

/// A remote chat-completion service. One call is one request; nothing is
/// retried or streamed.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, RemoteServiceError>;
}

pub fn create_chat_backend(config: &LlmConfig) -> Result<Arc<dyn ChatBackend>> {
    match config.provider.to_lowercase().as_str() {
        "cohere" => {
            let client = CohereClient::new(&config.base_url, config.model.clone())?;
            Ok(Arc::new(client))
        }
        other => Err(anyhow::anyhow!("Unsupported provider: {other}")),
    }
}

// ── Cohere v1 chat ───────────────────────────────────────────

#[derive(Serialize)]
struct CohereChatRequest<'a> {
    message: &'a str,
    chat_history: Vec<CohereChatMessage<'a>>,
    preamble: &'a str,
    prompt_truncation: PromptTruncation,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documents: Option<&'a [Snippet]>,
}

#[derive(Serialize)]
struct CohereChatMessage<'a> {
    role: &'static str,
    message: &'a str,
}

#[derive(Deserialize)]
struct CohereChatResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct CohereErrorBody {
    message: String,
}

fn cohere_role(role: Role) -> &'static str {
    match role {
        Role::User => "USER",
        Role::Assistant => "CHATBOT",
    }
}

#[derive(Clone)]
pub struct CohereClient {
    http: reqwest::Client,
    endpoint: Url,
    model: Option<String>,
}

impl CohereClient {
    /// `base_url` is the service root, e.g. `https://api.cohere.ai`.
    pub fn new(base_url: &str, model: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(base_url)
            .with_context(|| format!("Invalid chat service URL '{base_url}'"))?
            .join("v1/chat")
            .context("Failed to build chat endpoint URL")?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            model,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for CohereClient {
    async fn chat(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, RemoteServiceError> {
        let body = CohereChatRequest {
            message: &request.message,
            chat_history: request
                .chat_history
                .iter()
                .map(|m| CohereChatMessage {
                    role: cohere_role(m.role),
                    message: &m.text,
                })
                .collect(),
            preamble: request.preamble,
            prompt_truncation: request.prompt_truncation,
            model: self.model.as_deref(),
            documents: (!request.documents.is_empty()).then_some(request.documents.as_slice()),
        };

        tracing::debug!(
            "Sending chat request ({} history messages, {} documents)",
            body.chat_history.len(),
            request.documents.len()
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<CohereErrorBody>(&raw)
                .map(|b| b.message)
                .unwrap_or(raw);
            return Err(RemoteServiceError::Status { status, message });
        }

        let parsed: CohereChatResponse = response
            .json()
            .await
            .map_err(|e| RemoteServiceError::Malformed(e.to_string()))?;

        let text = parsed
            .text
            .ok_or_else(|| RemoteServiceError::Malformed("response has no text".to_string()))?;

        Ok(ChatReply { text })
    }
}

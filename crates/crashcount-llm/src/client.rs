//! HTTP client asking a chat-completions endpoint how many vehicles a report describes.

use std::time::Duration;

use crashcount_core::{ReplyParseError, TargetModel};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{ChatRequest, ChatResponse, Message};

/// Fixed instruction sent ahead of every report.
pub const SYSTEM_PROMPT: &str = "Read the text given in the user prompt and answer how many vehicles were involved in the accident. Only output a number.";

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response contained no choices")]
    NoChoices,
    #[error(transparent)]
    Reply(#[from] ReplyParseError),
}

/// Endpoint and sampling settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full chat-completions URL.
    pub endpoint: String,
    pub timeout: Duration,
    pub temperature: f64,
    /// `-1` leaves generation length uncapped.
    pub max_tokens: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:1234/v1/chat/completions".to_string(),
            timeout: Duration::from_secs(300),
            temperature: 0.2,
            max_tokens: -1,
        }
    }
}

pub struct CountClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl CountClient {
    pub fn new(config: ClientConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Two-message request: [`SYSTEM_PROMPT`], then the report.
    pub fn request_for(&self, sentence: &str, model: TargetModel) -> ChatRequest {
        ChatRequest {
            model,
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(sentence)],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        }
    }

    /// Ask `model` for the vehicle count in `sentence`.
    ///
    /// The reply is parsed with the model family's convention.
    pub async fn extract_count(&self, sentence: &str, model: TargetModel) -> Result<i64, LlmError> {
        let request = self.request_for(sentence, model);

        debug!(url = %self.config.endpoint, %model, "requesting vehicle count");
        let resp = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let response: ChatResponse = serde_json::from_str(&body)?;
        let content = response.first_content().ok_or(LlmError::NoChoices)?;
        let count = model.parse_count(content)?;

        if let Some(usage) = response.usage {
            debug!(
                count,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "received vehicle count"
            );
        }
        Ok(count)
    }

    /// Log the endpoint this client talks to.
    pub fn announce(&self, model: TargetModel) {
        info!(
            endpoint = %self.config.endpoint,
            %model,
            family = model.family().as_str(),
            temperature = self.config.temperature,
            "LLM client ready"
        );
    }
}

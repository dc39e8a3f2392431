//! OpenAI-compatible chat-completions client.

use crate::domain::model::{ChatMessage, ChatRequest, ModelRole};
use crate::domain::ports::{ChatModel, ConfigProvider};
use crate::utils::error::{AnalystError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_COMPLETION_TOKENS: u32 = 2048;

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    api_base: String,
    model: String,
    vision_model: String,
    temperature: f32,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new<C: ConfigProvider + ?Sized>(config: &C, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs()))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            api_base: config.api_base().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            vision_model: config.vision_model().to_string(),
            temperature: config.temperature(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    fn model_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Reasoning => &self.model,
            ModelRole::Vision => &self.vision_model,
        }
    }
}

/// Maps a non-success status to the error the caller should see.
fn status_error(status: StatusCode, body: &str) -> AnalystError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status.as_u16() {
        401 | 403 => AnalystError::InvalidApiKey { message },
        429 => AnalystError::RateLimited { message },
        code => AnalystError::ModelApi {
            status: code,
            message,
        },
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let model = self.model_for(request.role);
        let body = CompletionBody {
            model,
            messages: &request.messages,
            temperature: self.temperature,
            max_tokens: MAX_COMPLETION_TOKENS,
            response_format: request.json_response.then_some(ResponseFormat {
                r#type: "json_object",
            }),
        };

        tracing::debug!(
            "Calling chat completions: model={}, messages={}, json={}",
            model,
            request.messages.len(),
            request.json_response
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Chat completions response status: {}", status);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = status_error(status, &text);
            tracing::warn!("Model API error: {}", err);
            return Err(err);
        }

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnalystError::MalformedResponse {
                message: "completion contained no message content".to_string(),
            })
    }
}

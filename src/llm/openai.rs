//! OpenAI-compatible chat/completions backend over `reqwest`.
//!
//! Works against api.openai.com or any endpoint speaking the same wire
//! format (Azure gateways, vLLM, LiteLLM). Only the pieces the pipeline
//! needs are modelled: one non-streaming completion per call, with
//! optional multimodal user content.

use super::{ChatClient, ChatMessage, ChatResponse, CompletionOptions};
use crate::error::PitchlensError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Default OpenAI API endpoint.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key; sent as a bearer token when present.
    pub api_key: Option<String>,
    /// Model used when a call doesn't override it.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: 120,
        }
    }
}

/// OpenAI-compatible [`ChatClient`] implementation.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self, PitchlensError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PitchlensError::Internal(format!("HTTP client build failed: {e}")))?;

        info!(
            "Chat backend: url={}, model={}",
            config.base_url, config.model
        );

        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    ///
    /// Reads `OPENAI_API_KEY` (required), `OPENAI_BASE_URL`,
    /// `OPENAI_MODEL` and `OPENAI_TIMEOUT`.
    pub fn from_env() -> Result<Self, PitchlensError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PitchlensError::LlmNotConfigured {
                hint: "Set OPENAI_API_KEY (and optionally OPENAI_BASE_URL for a \
                       compatible endpoint)."
                    .to_string(),
            })?;

        let config = OpenAiConfig {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_URL.to_string()),
            api_key: Some(api_key),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
        };

        Self::new(config)
    }

    /// Current configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {api_key}"));
        }

        req.header("Content-Type", "application/json")
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatResponse, PitchlensError> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        debug!("Chat call: model={}, {} messages", model, messages.len());

        let request = ChatCompletionRequest {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| PitchlensError::LlmApi {
                message: format!("request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body: ApiErrorResponse = response.json().await.unwrap_or_default();
            return Err(PitchlensError::LlmApi {
                message: format!("API returned {}: {}", status, body.error.message),
            });
        }

        let result: ChatCompletionResponse =
            response.json().await.map_err(|e| PitchlensError::LlmApi {
                message: format!("failed to parse response: {e}"),
            })?;

        let usage = result.usage.unwrap_or_default();
        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PitchlensError::LlmApi {
                message: "empty completion".to_string(),
            })?;

        debug!(
            "Chat reply: {} chars, {} in / {} out tokens",
            content.len(),
            usage.prompt_tokens,
            usage.completion_tokens
        );

        Ok(ChatResponse {
            content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

/// Request body for the chat/completions endpoint.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: String,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Response from the chat/completions endpoint.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Error envelope returned by OpenAI-compatible APIs.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl Default for ApiError {
    fn default() -> Self {
        ApiError {
            message: "unknown error".to_string(),
        }
    }
}

//! Chat-model client: message types, the [`ChatClient`] seam, and retry.
//!
//! The pipeline never talks HTTP directly — every model interaction goes
//! through the [`ChatClient`] trait so tests can substitute a scripted
//! implementation and deployments can point at any OpenAI-compatible
//! endpoint. The shipped backend is [`OpenAiClient`].
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx errors from chat APIs are transient and frequent under
//! load. [`chat_with_retry`] applies exponential backoff
//! (`backoff_ms * 2^(attempt-1)`): with the 500 ms default and 3 retries
//! the wait sequence is 500 ms → 1 s → 2 s per call.

mod openai;

pub use openai::OpenAiClient;

use crate::error::PitchlensError;
use async_trait::async_trait;
use serde::Serialize;
use tokio::time::{sleep, Duration};
use tracing::warn;

// ── Message model ────────────────────────────────────────────────────────

/// A role-tagged message in a chat request.
///
/// `content` is either a plain string (system/assistant turns, text-only
/// user turns) or a list of parts when a user turn attaches slide images.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    /// A system message establishing instructions.
    pub fn system(text: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// A plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// A prior assistant turn (used when replaying follow-up history).
    pub fn assistant(text: impl Into<String>) -> Self {
        ChatMessage {
            role: "assistant".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message carrying text plus inline image attachments.
    pub fn user_with_images(text: impl Into<String>, images: Vec<ImageAttachment>) -> Self {
        let mut parts = vec![ContentPart::Text { text: text.into() }];
        parts.extend(
            images
                .into_iter()
                .map(|image_url| ContentPart::ImageUrl { image_url }),
        );
        ChatMessage {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        }
    }
}

/// Message body: plain text or multimodal parts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multimodal user message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageAttachment },
}

/// An inline image, carried as a base64 data URI.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAttachment {
    /// `data:image/png;base64,...` URI.
    pub url: String,
    /// Requested analysis detail (`"high"` for slide content).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ImageAttachment {
    /// Wrap already-encoded base64 PNG data as a high-detail attachment.
    ///
    /// `detail: "high"` makes GPT-4-class models tile the image at full
    /// resolution; without it small slide text (traction numbers, axis
    /// labels) is lost to the single low-res overview tile.
    pub fn png_base64(b64: impl AsRef<str>) -> Self {
        ImageAttachment {
            url: format!("data:image/png;base64,{}", b64.as_ref()),
            detail: Some("high".to_string()),
        }
    }
}

// ── Per-call options ─────────────────────────────────────────────────────

/// Options for one chat completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Model ID override; the backend's default model when `None`.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// One assistant reply, with token accounting when the API reports it.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── The seam ─────────────────────────────────────────────────────────────

/// A chat/completions backend.
///
/// Implementations must be cheap to share (`Arc<dyn ChatClient>`) across
/// concurrent requests.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the full message list and return one assistant reply.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatResponse, PitchlensError>;
}

// ── Retry wrapper ────────────────────────────────────────────────────────

/// Call `client.chat` with exponential-backoff retries.
///
/// `label` names the call site in the logs ("batch 2", "synthesis", …).
/// Every error is treated as retryable; a permanent error (bad API key)
/// simply burns the retries quickly and surfaces on the last attempt.
pub async fn chat_with_retry(
    client: &dyn ChatClient,
    messages: &[ChatMessage],
    options: &CompletionOptions,
    max_retries: u32,
    backoff_ms: u64,
    label: &str,
) -> Result<ChatResponse, PitchlensError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                label, attempt, max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match client.chat(messages, options).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                warn!("{}: attempt {} failed — {}", label, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| PitchlensError::LlmApi {
        message: "retry loop exhausted without an error".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn text_message_serializes_as_plain_string() {
        let msg = ChatMessage::system("be terse");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be terse");
    }

    #[test]
    fn image_message_serializes_as_parts() {
        let msg = ChatMessage::user_with_images(
            "look at these",
            vec![ImageAttachment::png_base64("QUJD")],
        );
        let json = serde_json::to_value(&msg).unwrap();
        let parts = json["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/png;base64,QUJD"
        );
        assert_eq!(parts[1]["image_url"]["detail"], "high");
    }

    struct FlakyClient {
        calls: AtomicUsize,
        succeed_on: usize,
    }

    #[async_trait]
    impl ChatClient for FlakyClient {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<ChatResponse, PitchlensError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_on {
                Ok(ChatResponse {
                    content: "ok".into(),
                    prompt_tokens: 0,
                    completion_tokens: 0,
                })
            } else {
                Err(PitchlensError::LlmApi {
                    message: "503".into(),
                })
            }
        }
    }

    #[tokio::test]
    async fn retry_recovers_from_transient_failures() {
        let client = FlakyClient {
            calls: AtomicUsize::new(0),
            succeed_on: 3,
        };
        let opts = CompletionOptions::default();
        let resp = chat_with_retry(&client, &[], &opts, 3, 1, "test").await.unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_surfaces_last_error_when_exhausted() {
        let client = FlakyClient {
            calls: AtomicUsize::new(0),
            succeed_on: usize::MAX,
        };
        let opts = CompletionOptions::default();
        let err = chat_with_retry(&client, &[], &opts, 2, 1, "test")
            .await
            .unwrap_err();
        assert!(matches!(err, PitchlensError::LlmApi { .. }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }
}

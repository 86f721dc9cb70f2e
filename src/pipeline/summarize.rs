//! Per-batch slide summarization: vision calls in deck order.
//!
//! Each batch becomes one chat request — the standing analyst prompt plus
//! the batch's slides as high-detail image attachments — and the replies
//! are joined strictly in batch order into one accumulated narrative.
//! Ordered `buffered` dispatch keeps that guarantee even when
//! `batch_concurrency > 1`: futures may run concurrently but yield in
//! submission order.
//!
//! Failure policy: the first batch whose call fails (after per-call
//! retries) aborts the whole request. A report with a silent hole where
//! the traction slides should be is worse than an error the user can
//! retry.

use crate::config::AnalysisConfig;
use crate::error::PitchlensError;
use crate::llm::{chat_with_retry, ChatClient, ChatMessage, CompletionOptions};
use crate::pipeline::batch::AnalysisBatch;
use crate::pipeline::encode::encode_slide;
use crate::prompts::{BATCH_USER_PROMPT, SLIDE_ANALYST_SYSTEM_PROMPT};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Summarize all batches and return the accumulated narrative.
///
/// The returned buffer mirrors the deck's page order: batch 0's
/// observations always precede batch 1's, separated by blank lines.
pub async fn summarize_batches(
    client: &Arc<dyn ChatClient>,
    batches: &[AnalysisBatch],
    config: &AnalysisConfig,
) -> Result<String, PitchlensError> {
    let start = Instant::now();

    // Each future owns its batch; borrowing from the slice across the
    // buffered stream makes the combined future non-Send.
    let futs = batches.iter().cloned().map(|batch| {
        let client = Arc::clone(client);
        let config = config.clone();
        async move { summarize_one(client.as_ref(), &batch, &config).await }
    });

    let texts: Vec<String> = stream::iter(futs)
        .buffered(config.batch_concurrency)
        .try_collect()
        .await?;

    info!(
        "Summarized {} batches in {}ms",
        batches.len(),
        start.elapsed().as_millis()
    );

    Ok(texts.join("\n\n"))
}

/// One vision call for one batch.
async fn summarize_one(
    client: &dyn ChatClient,
    batch: &AnalysisBatch,
    config: &AnalysisConfig,
) -> Result<String, PitchlensError> {
    let (first, last) = batch.slide_range();
    debug!(
        "Batch {}: encoding slides {}–{}",
        batch.index, first, last
    );

    let mut images = Vec::with_capacity(batch.slides.len());
    for slide in &batch.slides {
        images.push(encode_slide(slide).await?);
    }

    let messages = vec![
        ChatMessage::system(SLIDE_ANALYST_SYSTEM_PROMPT),
        ChatMessage::user_with_images(BATCH_USER_PROMPT, images),
    ];

    let options = CompletionOptions {
        model: Some(config.vision_model.clone()),
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
    };

    let label = format!("batch {} (slides {}–{})", batch.index + 1, first, last);
    let response = chat_with_retry(
        client,
        &messages,
        &options,
        config.max_retries,
        config.retry_backoff_ms,
        &label,
    )
    .await?;

    Ok(response.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, ContentPart, MessageContent};
    use crate::pipeline::batch::partition;
    use crate::pipeline::rasterize::SlideImage;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Names each reply after the first slide in the request, recovered
    /// from the image payload itself. Call arrival order is irrelevant,
    /// so the ordering assertions hold under any concurrency.
    struct SlideEchoChat {
        calls: AtomicUsize,
    }

    impl SlideEchoChat {
        fn new() -> Self {
            SlideEchoChat {
                calls: AtomicUsize::new(0),
            }
        }

        /// The staged fixture files hold `png{index}`; decode the first
        /// attachment back to that tag.
        fn first_slide_tag(messages: &[ChatMessage]) -> String {
            let parts = messages
                .iter()
                .find_map(|m| match &m.content {
                    MessageContent::Parts(parts) => Some(parts),
                    MessageContent::Text(_) => None,
                })
                .expect("a multimodal user turn");
            let url = parts
                .iter()
                .find_map(|p| match p {
                    ContentPart::ImageUrl { image_url } => Some(&image_url.url),
                    ContentPart::Text { .. } => None,
                })
                .expect("at least one image part");
            let b64 = url
                .strip_prefix("data:image/png;base64,")
                .expect("data URI");
            String::from_utf8(STANDARD.decode(b64).unwrap()).unwrap()
        }
    }

    #[async_trait]
    impl ChatClient for SlideEchoChat {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<ChatResponse, PitchlensError> {
            assert_eq!(messages.len(), 2, "system + user with images");
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse {
                content: format!("observations from {}", Self::first_slide_tag(messages)),
                prompt_tokens: 0,
                completion_tokens: 0,
            })
        }
    }

    fn staged_slides(dir: &std::path::Path, n: usize) -> Vec<SlideImage> {
        (1..=n)
            .map(|index| {
                let path = dir.join(format!("slide-{index}.png"));
                std::fs::write(&path, format!("png{index}")).unwrap();
                SlideImage { index, path }
            })
            .collect()
    }

    #[tokio::test]
    async fn sequential_batches_concatenate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let slides = staged_slides(dir.path(), 7);
        let batches = partition(&slides, 3);
        let client: Arc<dyn ChatClient> = Arc::new(SlideEchoChat::new());
        let config = AnalysisConfig::default();

        let narrative = summarize_batches(&client, &batches, &config).await.unwrap();
        assert_eq!(
            narrative,
            "observations from png1\n\nobservations from png4\n\nobservations from png7"
        );
    }

    #[tokio::test]
    async fn concurrent_batches_still_concatenate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let slides = staged_slides(dir.path(), 8);
        let batches = partition(&slides, 2);
        let client = Arc::new(SlideEchoChat::new());
        let config = AnalysisConfig::builder().batch_concurrency(4).build().unwrap();

        // Futures may complete in any order; the joined narrative must
        // still follow batch order because buffered() yields in
        // submission order.
        let narrative = summarize_batches(
            &(client.clone() as Arc<dyn ChatClient>),
            &batches,
            &config,
        )
        .await
        .unwrap();
        assert_eq!(
            narrative,
            "observations from png1\n\nobservations from png3\n\n\
             observations from png5\n\nobservations from png7"
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
    }

    /// The summarization future crosses an axum handler boundary, which
    /// requires `Send`. Borrowing the batches across the buffered stream
    /// breaks that; this keeps it checked at compile time.
    #[tokio::test]
    async fn summarize_future_is_send() {
        fn require_send<F: std::future::Future + Send>(f: F) -> F {
            f
        }

        let dir = tempfile::tempdir().unwrap();
        let slides = staged_slides(dir.path(), 2);
        let batches = partition(&slides, 2);
        let client: Arc<dyn ChatClient> = Arc::new(SlideEchoChat::new());
        let config = AnalysisConfig::default();

        let narrative = require_send(summarize_batches(&client, &batches, &config))
            .await
            .unwrap();
        assert_eq!(narrative, "observations from png1");
    }

    struct AlwaysFails;

    #[async_trait]
    impl ChatClient for AlwaysFails {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<ChatResponse, PitchlensError> {
            Err(PitchlensError::LlmApi {
                message: "500".into(),
            })
        }
    }

    #[tokio::test]
    async fn batch_failure_aborts_the_request() {
        let dir = tempfile::tempdir().unwrap();
        let slides = staged_slides(dir.path(), 2);
        let batches = partition(&slides, 4);
        let client: Arc<dyn ChatClient> = Arc::new(AlwaysFails);
        let config = AnalysisConfig::builder()
            .max_retries(1)
            .retry_backoff_ms(1)
            .build()
            .unwrap();

        let err = summarize_batches(&client, &batches, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PitchlensError::LlmApi { .. }));
    }
}

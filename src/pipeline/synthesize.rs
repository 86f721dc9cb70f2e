//! Final synthesis: one call merging slide narrative and enrichment.
//!
//! The synthesis request is the only place the whole deck (and the
//! optional verified company data) is visible at once, so this is where
//! the report structure and the 0–100 score are mandated. The raw text
//! comes back unparsed; [`crate::report`] provides the validated view.

use crate::config::AnalysisConfig;
use crate::error::PitchlensError;
use crate::llm::{chat_with_retry, ChatClient, ChatMessage, CompletionOptions};
use crate::prompts::{synthesis_prompt, SYNTHESIS_SYSTEM_PROMPT};
use tracing::info;

/// Produce the final analysis text from the accumulated slide narrative
/// and the optional enrichment summary.
pub async fn synthesize(
    client: &dyn ChatClient,
    slide_narrative: &str,
    enrichment_summary: Option<&str>,
    config: &AnalysisConfig,
) -> Result<String, PitchlensError> {
    let messages = vec![
        ChatMessage::system(SYNTHESIS_SYSTEM_PROMPT),
        ChatMessage::user(synthesis_prompt(slide_narrative, enrichment_summary)),
    ];

    let options = CompletionOptions {
        model: Some(config.vision_model.clone()),
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
    };

    let response = chat_with_retry(
        client,
        &messages,
        &options,
        config.max_retries,
        config.retry_backoff_ms,
        "synthesis",
    )
    .await?;

    info!(
        "Synthesis complete: {} chars ({} enrichment)",
        response.content.len(),
        if enrichment_summary.is_some() {
            "with"
        } else {
            "without"
        }
    );

    Ok(response.content)
}

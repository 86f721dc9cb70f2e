//! End-to-end pipeline tests with mocked collaborators.
//!
//! The rasterizer writes real PNG-named files into the staging directory
//! and the chat client scripts its replies by call type, so these tests
//! exercise the full orchestration — staging, batching, ordering,
//! enrichment degradation, caching and cleanup — without `pdftoppm` or a
//! network.

use async_trait::async_trait;
use pitchlens::enrich::{CompanyProfile, EnrichError, EnrichmentClient};
use pitchlens::llm::{ChatClient, ChatMessage, ChatResponse, CompletionOptions, MessageContent};
use pitchlens::{
    AnalysisConfig, Analyzer, PitchlensError, Rasterizer, SlideImage,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Mocks ────────────────────────────────────────────────────────────────

/// Writes `pages` fake slide files and counts invocations.
struct MockRasterizer {
    pages: usize,
    calls: AtomicUsize,
}

impl MockRasterizer {
    fn new(pages: usize) -> Self {
        MockRasterizer {
            pages,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Rasterizer for MockRasterizer {
    async fn rasterize(
        &self,
        _pdf_path: &Path,
        out_dir: &Path,
        _dpi: u32,
    ) -> Result<Vec<SlideImage>, PitchlensError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut slides = Vec::new();
        for index in 1..=self.pages {
            let path = out_dir.join(format!("slide-{index:02}.png"));
            tokio::fs::write(&path, format!("fake png {index}"))
                .await
                .map_err(|source| PitchlensError::Staging {
                    path: path.clone(),
                    source,
                })?;
            slides.push(SlideImage { index, path });
        }
        Ok(slides)
    }
}

/// Scripts replies by request shape: vision batches (multimodal user
/// turn) get numbered observations, everything else gets a canned
/// report. Records every request's user prompt for assertions.
struct ScriptedChat {
    batch_calls: AtomicUsize,
    other_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    fn new() -> Self {
        ScriptedChat {
            batch_calls: AtomicUsize::new(0),
            other_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn is_vision_request(messages: &[ChatMessage]) -> bool {
        messages
            .iter()
            .any(|m| matches!(m.content, MessageContent::Parts(_)))
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<ChatResponse, PitchlensError> {
        let user_text = messages
            .iter()
            .filter_map(|m| match &m.content {
                MessageContent::Text(t) if m.role == "user" => Some(t.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(user_text);

        let content = if Self::is_vision_request(messages) {
            let n = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
            format!("observations for batch {n}")
        } else {
            self.other_calls.fetch_add(1, Ordering::SeqCst);
            "EXECUTIVE SUMMARY\nAcme sells anvils.\n\n\
             FINAL ASSESSMENT\nInvestment Score: [73/100]"
                .to_string()
        };

        Ok(ChatResponse {
            content,
            prompt_tokens: 100,
            completion_tokens: 50,
        })
    }
}

struct FailingEnrichment;

#[async_trait]
impl EnrichmentClient for FailingEnrichment {
    async fn fetch(&self, _domain: &str) -> Result<Option<CompanyProfile>, EnrichError> {
        Err(EnrichError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "upstream down".into(),
        })
    }
}

struct StaticEnrichment;

#[async_trait]
impl EnrichmentClient for StaticEnrichment {
    async fn fetch(&self, domain: &str) -> Result<Option<CompanyProfile>, EnrichError> {
        Ok(Some(CompanyProfile {
            name: Some("Acme".into()),
            employee_count: Some(12),
            website_domain: Some(domain.into()),
            ..Default::default()
        }))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn pdf_bytes(tag: &str) -> Vec<u8> {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.extend_from_slice(tag.as_bytes());
    bytes
}

fn config(dir: &Path) -> AnalysisConfig {
    AnalysisConfig::builder()
        .data_dir(dir)
        .retry_backoff_ms(1)
        .build()
        .unwrap()
}

struct Harness {
    analyzer: Analyzer,
    rasterizer: Arc<MockRasterizer>,
    chat: Arc<ScriptedChat>,
}

fn harness(
    config: AnalysisConfig,
    pages: usize,
    enrichment: Option<Arc<dyn EnrichmentClient>>,
) -> Harness {
    let rasterizer = Arc::new(MockRasterizer::new(pages));
    let chat = Arc::new(ScriptedChat::new());
    let analyzer = Analyzer::new(
        config,
        rasterizer.clone() as Arc<dyn Rasterizer>,
        chat.clone() as Arc<dyn ChatClient>,
        enrichment,
    )
    .unwrap();
    Harness {
        analyzer,
        rasterizer,
        chat,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn small_deck_is_one_batch_and_one_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(config(dir.path()), 3, None);

    let output = h.analyzer.analyze(&pdf_bytes("deck-a"), None).await.unwrap();

    assert!(!output.cached);
    assert_eq!(output.stats.slides, 3);
    assert_eq!(output.stats.batches, 1);
    assert!(!output.stats.enriched);
    assert!(output.analysis.contains("Investment Score: [73/100]"));
    assert_eq!(h.rasterizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.chat.batch_calls.load(Ordering::SeqCst), 1);
    // Synthesis only; no enrichment summary call.
    assert_eq!(h.chat.other_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_upload_hits_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(config(dir.path()), 3, None);
    let bytes = pdf_bytes("deck-b");

    let first = h.analyzer.analyze(&bytes, None).await.unwrap();
    let second = h.analyzer.analyze(&bytes, None).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.analysis, second.analysis);
    assert_eq!(first.fingerprint, second.fingerprint);
    // The second run touched no collaborator.
    assert_eq!(h.rasterizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.chat.batch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.chat.other_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn batches_feed_synthesis_in_deck_order() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AnalysisConfig::builder()
        .data_dir(dir.path())
        .batch_size(3)
        .retry_backoff_ms(1)
        .build()
        .unwrap();
    let h = harness(cfg, 7, None);

    let output = h.analyzer.analyze(&pdf_bytes("deck-c"), None).await.unwrap();
    assert_eq!(output.stats.batches, 3);
    assert_eq!(h.chat.batch_calls.load(Ordering::SeqCst), 3);

    // The synthesis prompt is the last recorded user turn; it must carry
    // the accumulated observations in batch order.
    let prompts = h.chat.prompts.lock().unwrap();
    let synthesis = prompts.last().unwrap();
    let p1 = synthesis.find("observations for batch 1").unwrap();
    let p2 = synthesis.find("observations for batch 2").unwrap();
    let p3 = synthesis.find("observations for batch 3").unwrap();
    assert!(p1 < p2 && p2 < p3);
}

#[tokio::test]
async fn enrichment_failure_degrades_to_deck_only() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(config(dir.path()), 2, Some(Arc::new(FailingEnrichment)));

    let output = h
        .analyzer
        .analyze(&pdf_bytes("deck-d"), Some("acme.dev"))
        .await
        .unwrap();

    assert!(!output.stats.enriched);
    assert!(output.analysis.contains("Investment Score"));

    let prompts = h.chat.prompts.lock().unwrap();
    let synthesis = prompts.last().unwrap();
    assert!(!synthesis.contains("VERIFIED COMPANY DATA"));
}

#[tokio::test]
async fn enrichment_data_reaches_the_synthesis_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(config(dir.path()), 2, Some(Arc::new(StaticEnrichment)));

    let output = h
        .analyzer
        .analyze(&pdf_bytes("deck-e"), Some("acme.dev"))
        .await
        .unwrap();

    assert!(output.stats.enriched);
    // One enrichment-summary call plus one synthesis call.
    assert_eq!(h.chat.other_calls.load(Ordering::SeqCst), 2);

    let prompts = h.chat.prompts.lock().unwrap();
    let synthesis = prompts.last().unwrap();
    assert!(synthesis.contains("VERIFIED COMPANY DATA"));
}

#[tokio::test]
async fn staging_is_removed_after_a_persisted_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(config(dir.path()), 2, None);

    let output = h.analyzer.analyze(&pdf_bytes("deck-f"), None).await.unwrap();
    let hex = output.fingerprint.as_hex();

    let upload = dir.path().join("uploads").join(format!("{hex}.pdf"));
    let slides = dir.path().join("slides").join(hex);
    let cache_entry = dir.path().join("cache").join(format!("{hex}.json"));

    assert!(!upload.exists(), "staged PDF should be cleaned up");
    assert!(!slides.exists(), "slide directory should be cleaned up");
    assert!(cache_entry.exists(), "cache entry should persist");
}

#[tokio::test]
async fn staging_is_kept_when_cleanup_is_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = AnalysisConfig::builder()
        .data_dir(dir.path())
        .cleanup_staging(false)
        .retry_backoff_ms(1)
        .build()
        .unwrap();
    let h = harness(cfg, 2, None);

    let output = h.analyzer.analyze(&pdf_bytes("deck-g"), None).await.unwrap();
    let hex = output.fingerprint.as_hex();

    assert!(dir.path().join("uploads").join(format!("{hex}.pdf")).exists());
    assert!(dir.path().join("slides").join(hex).exists());
}

#[tokio::test]
async fn non_pdf_upload_is_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(config(dir.path()), 2, None);

    let err = h
        .analyzer
        .analyze(b"PK\x03\x04 not a pdf", None)
        .await
        .unwrap_err();

    assert!(matches!(err, PitchlensError::NotAPdf { .. }));
    assert_eq!(h.rasterizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.chat.batch_calls.load(Ordering::SeqCst), 0);
}

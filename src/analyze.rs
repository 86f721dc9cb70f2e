//! The analysis orchestrator.
//!
//! [`Analyzer`] owns the collaborators (cache, rasterizer, chat client,
//! optional enrichment) and runs the pipeline end to end:
//!
//! fingerprint → cache lookup → stage upload → rasterize → batch →
//! summarize → enrich (optional) → synthesize → cache put → cleanup.
//!
//! The cache check happens before any staging I/O, so a repeated upload
//! costs one SHA-256 pass and one file read. Enrichment failures degrade
//! to a deck-only report; cache-write and cleanup failures are logged and
//! absorbed. Staged files are removed only after the result is safely in
//! the cache — an analysis that cannot be persisted keeps its artifacts
//! for a retry.

use crate::cache::{AnalysisCache, CachedAnalysis};
use crate::config::AnalysisConfig;
use crate::enrich::{self, CompanyProfile, EnrichmentClient};
use crate::error::PitchlensError;
use crate::fingerprint::Fingerprint;
use crate::llm::ChatClient;
use crate::pipeline::batch::partition;
use crate::pipeline::rasterize::Rasterizer;
use crate::pipeline::{summarize::summarize_batches, synthesize::synthesize};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Result of one analysis request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    /// Content address of the uploaded deck.
    pub fingerprint: Fingerprint,
    /// The full analysis text.
    pub analysis: String,
    /// True when the result came from the cache without any model calls.
    pub cached: bool,
    pub stats: AnalysisStats,
}

/// Timing and shape of the work performed. All zeros on a cache hit
/// except `total_duration_ms`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    pub slides: usize,
    pub batches: usize,
    pub enriched: bool,
    pub total_duration_ms: u64,
    pub rasterize_ms: u64,
    pub llm_ms: u64,
}

/// Runs deck analyses. Cheap to clone behind an `Arc` into handlers.
pub struct Analyzer {
    config: AnalysisConfig,
    cache: AnalysisCache,
    rasterizer: Arc<dyn Rasterizer>,
    chat: Arc<dyn ChatClient>,
    enrichment: Option<Arc<dyn EnrichmentClient>>,
}

impl Analyzer {
    /// Build an analyzer and bootstrap the data directories.
    pub fn new(
        config: AnalysisConfig,
        rasterizer: Arc<dyn Rasterizer>,
        chat: Arc<dyn ChatClient>,
        enrichment: Option<Arc<dyn EnrichmentClient>>,
    ) -> Result<Self, PitchlensError> {
        for dir in [config.uploads_dir(), config.slides_dir()] {
            std::fs::create_dir_all(&dir).map_err(|source| PitchlensError::Bootstrap {
                path: dir.clone(),
                source,
            })?;
        }
        let cache = AnalysisCache::open(config.cache_dir()).map_err(|source| {
            PitchlensError::Bootstrap {
                path: config.cache_dir(),
                source,
            }
        })?;

        Ok(Analyzer {
            config,
            cache,
            rasterizer,
            chat,
            enrichment,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn chat_client(&self) -> &Arc<dyn ChatClient> {
        &self.chat
    }

    pub fn enrichment_client(&self) -> Option<&Arc<dyn EnrichmentClient>> {
        self.enrichment.as_ref()
    }

    /// Analyze a deck. `website` opts into company enrichment.
    pub async fn analyze(
        &self,
        pdf_bytes: &[u8],
        website: Option<&str>,
    ) -> Result<AnalysisOutput, PitchlensError> {
        let start = Instant::now();

        if pdf_bytes.len() < PDF_MAGIC.len() || &pdf_bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
            let mut magic = [0u8; 4];
            let n = pdf_bytes.len().min(4);
            magic[..n].copy_from_slice(&pdf_bytes[..n]);
            return Err(PitchlensError::NotAPdf { magic });
        }

        let fingerprint = Fingerprint::of_bytes(pdf_bytes);
        info!("Analyzing deck {} ({} bytes)", fingerprint, pdf_bytes.len());

        if let Some(hit) = self.cache.get(&fingerprint).await {
            info!("Cache hit for {} — skipping pipeline", fingerprint);
            return Ok(AnalysisOutput {
                fingerprint,
                analysis: hit.analysis,
                cached: true,
                stats: AnalysisStats {
                    total_duration_ms: start.elapsed().as_millis() as u64,
                    ..Default::default()
                },
            });
        }

        // Stage the upload and rasterize it.
        let pdf_path = self
            .config
            .uploads_dir()
            .join(format!("{}.pdf", fingerprint.as_hex()));
        tokio::fs::write(&pdf_path, pdf_bytes)
            .await
            .map_err(|source| PitchlensError::Staging {
                path: pdf_path.clone(),
                source,
            })?;

        let slides_dir = self.config.slides_dir().join(fingerprint.as_hex());
        tokio::fs::create_dir_all(&slides_dir)
            .await
            .map_err(|source| PitchlensError::Staging {
                path: slides_dir.clone(),
                source,
            })?;

        let rasterize_start = Instant::now();
        let slides = self
            .rasterizer
            .rasterize(&pdf_path, &slides_dir, self.config.dpi)
            .await?;
        let rasterize_ms = rasterize_start.elapsed().as_millis() as u64;
        info!("Rasterized {} slides in {}ms", slides.len(), rasterize_ms);

        // Vision pass, enrichment, synthesis.
        let llm_start = Instant::now();
        let batches = partition(&slides, self.config.batch_size);
        let narrative = summarize_batches(&self.chat, &batches, &self.config).await?;

        let (enrichment_summary, enrichment_snapshot) = match website {
            Some(domain) => self.enrich(domain).await,
            None => (None, None),
        };

        let analysis = synthesize(
            self.chat.as_ref(),
            &narrative,
            enrichment_summary.as_deref(),
            &self.config,
        )
        .await?;
        let llm_ms = llm_start.elapsed().as_millis() as u64;

        // Persist, then clean staging only once the result is durable.
        let entry = CachedAnalysis::new(analysis.clone(), enrichment_snapshot);
        let persisted = match self.cache.put(&fingerprint, &entry).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache write failed for {}: {}", fingerprint, e);
                false
            }
        };
        if persisted && self.config.cleanup_staging {
            self.cleanup_staging(&pdf_path, &slides_dir).await;
        }

        let stats = AnalysisStats {
            slides: slides.len(),
            batches: batches.len(),
            enriched: enrichment_summary.is_some(),
            total_duration_ms: start.elapsed().as_millis() as u64,
            rasterize_ms,
            llm_ms,
        };
        info!(
            "Analysis of {} complete: {} slides, {} batches, {}ms",
            fingerprint, stats.slides, stats.batches, stats.total_duration_ms
        );

        Ok(AnalysisOutput {
            fingerprint,
            analysis,
            cached: false,
            stats,
        })
    }

    /// Best-effort enrichment: returns the prompt summary and the raw
    /// snapshot for the cache entry. Any failure yields `(None, None)`.
    async fn enrich(&self, domain: &str) -> (Option<String>, Option<serde_json::Value>) {
        let Some(client) = &self.enrichment else {
            info!("Website provided but enrichment not configured; skipping");
            return (None, None);
        };

        let profile: CompanyProfile = match client.fetch(domain).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                info!("No company profile for '{}'; continuing without", domain);
                return (None, None);
            }
            Err(e) => {
                warn!("Enrichment failed for '{}': {}; continuing without", domain, e);
                return (None, None);
            }
        };

        let snapshot = serde_json::to_value(&profile).ok();
        let condensed = enrich::condense(&profile, self.config.max_profile_employees);
        match enrich::summarize_profile(self.chat.as_ref(), &condensed, &self.config).await {
            Ok(summary) => (Some(summary), snapshot),
            Err(e) => {
                warn!(
                    "Enrichment summary failed for '{}': {}; continuing without",
                    domain, e
                );
                (None, None)
            }
        }
    }

    async fn cleanup_staging(&self, pdf_path: &PathBuf, slides_dir: &PathBuf) {
        if let Err(e) = tokio::fs::remove_file(pdf_path).await {
            warn!("Staging cleanup: {} not removed: {}", pdf_path.display(), e);
        }
        if let Err(e) = tokio::fs::remove_dir_all(slides_dir).await {
            warn!(
                "Staging cleanup: {} not removed: {}",
                slides_dir.display(),
                e
            );
        }
    }
}

//! Configuration for deck analysis.
//!
//! Every knob lives in [`AnalysisConfig`], built via
//! [`AnalysisConfigBuilder`]. One struct makes configs cheap to clone into
//! handlers, easy to log, and easy to diff between two runs when their
//! outputs differ.

use crate::error::PitchlensError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the analysis pipeline.
///
/// Built via [`AnalysisConfig::builder()`] or [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use pitchlens::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .data_dir("/var/lib/pitchlens")
///     .batch_size(4)
///     .vision_model("gpt-4o")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Root directory for persistent and staging state. Default: `./data`.
    ///
    /// Holds three subdirectories, created at startup (idempotent):
    /// `cache/` (fingerprint → analysis JSON), `uploads/` (staged PDFs)
    /// and `slides/` (per-fingerprint rasterized pages).
    pub data_dir: PathBuf,

    /// Rasterization DPI passed to `pdftoppm -r`. Range 72–400. Default: 150.
    ///
    /// 150 keeps slide text sharp for the vision model while staying well
    /// under per-request payload limits; decks are mostly large type, so
    /// higher densities buy little and inflate every request.
    pub dpi: u32,

    /// Slides per vision request. Default: 4.
    ///
    /// Bounds the image payload and context cost of a single call. Batches
    /// always hold *consecutive* slides because the deck's narrative arc
    /// (problem → solution → market → team) is positional.
    pub batch_size: usize,

    /// Concurrent in-flight batch requests. Default: 1 (sequential).
    ///
    /// Batch results are joined strictly in deck order regardless of this
    /// setting; raising it only changes latency, not output. Values above
    /// 1 trade rate-limit headroom for wall-clock time.
    pub batch_concurrency: usize,

    /// Model for slide-image batches and final synthesis. Default: `gpt-4o`.
    pub vision_model: String,

    /// Model for text-only calls (enrichment summary, follow-up chat).
    /// Default: `gpt-4o`.
    pub text_model: String,

    /// Max completion tokens for analysis calls. Default: 4096.
    pub max_tokens: u32,

    /// Max completion tokens for follow-up chat replies. Default: 1000.
    pub chat_max_tokens: u32,

    /// Sampling temperature for all calls. Default: 0.7.
    ///
    /// The report is investment commentary, not transcription; some
    /// variance in phrasing is expected and harmless because the scoring
    /// rubric is pinned by the prompt.
    pub temperature: f32,

    /// Retry attempts per chat call on transient failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-request timeout for the chat API, seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Employees kept when condensing an enrichment profile. Default: 20.
    ///
    /// Enrichment payloads can carry hundreds of employee records; the
    /// prompt only needs enough to characterise the team.
    pub max_profile_employees: usize,

    /// Delete the staged PDF and slide images once the cache write
    /// succeeds. Default: true.
    ///
    /// Turn off to keep artifacts around for debugging a bad analysis.
    pub cleanup_staging: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            dpi: 150,
            batch_size: 4,
            batch_concurrency: 1,
            vision_model: "gpt-4o".to_string(),
            text_model: "gpt-4o".to_string(),
            max_tokens: 4096,
            chat_max_tokens: 1000,
            temperature: 0.7,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            max_profile_employees: 20,
            cleanup_staging: true,
        }
    }
}

impl AnalysisConfig {
    /// Create a new builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory for cached analysis results.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Directory for staged uploaded PDFs.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Directory under which per-fingerprint slide directories are created.
    pub fn slides_dir(&self) -> PathBuf {
        self.data_dir.join("slides")
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n.max(1);
        self
    }

    pub fn batch_concurrency(mut self, n: usize) -> Self {
        self.config.batch_concurrency = n.max(1);
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = model.into();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn chat_max_tokens(mut self, n: u32) -> Self {
        self.config.chat_max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_profile_employees(mut self, n: usize) -> Self {
        self.config.max_profile_employees = n;
        self
    }

    pub fn cleanup_staging(mut self, v: bool) -> Self {
        self.config.cleanup_staging = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, PitchlensError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(PitchlensError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.batch_size == 0 {
            return Err(PitchlensError::InvalidConfig(
                "Batch size must be ≥ 1".into(),
            ));
        }
        if c.batch_concurrency == 0 {
            return Err(PitchlensError::InvalidConfig(
                "Batch concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = AnalysisConfig::default();
        assert_eq!(c.batch_size, 4);
        assert_eq!(c.batch_concurrency, 1);
        assert!(c.cleanup_staging);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = AnalysisConfig::builder()
            .dpi(9999)
            .batch_size(0)
            .batch_concurrency(0)
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.batch_size, 1);
        assert_eq!(c.batch_concurrency, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn derived_directories_hang_off_data_dir() {
        let c = AnalysisConfig::builder().data_dir("/srv/pl").build().unwrap();
        assert_eq!(c.cache_dir(), PathBuf::from("/srv/pl/cache"));
        assert_eq!(c.uploads_dir(), PathBuf::from("/srv/pl/uploads"));
        assert_eq!(c.slides_dir(), PathBuf::from("/srv/pl/slides"));
    }
}

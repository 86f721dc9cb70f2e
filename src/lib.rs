//! # pitchlens
//!
//! Analyse startup pitch decks with a vision LLM.
//!
//! A user uploads a PDF deck; pitchlens rasterises it to slide images,
//! walks the slides through a vision-capable chat model in fixed-size
//! batches, optionally grounds the result in third-party company data,
//! and returns one narrative investment report with a 0–100 score.
//! Results are cached by content fingerprint so re-uploading the same
//! deck never repeats the expensive model calls.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Fingerprint  SHA-256 of the raw bytes — the cache key
//!  ├─ 2. Cache lookup hit returns the stored report immediately
//!  ├─ 3. Rasterize    pdftoppm renders one PNG per slide
//!  ├─ 4. Batch        slides grouped in deck order (default 4 per batch)
//!  ├─ 5. Summarize    one vision call per batch, observations accumulated
//!  ├─ 6. Enrich       optional company-data fetch + narrative summary
//!  ├─ 7. Synthesize   one final call → sectioned report + investment score
//!  └─ 8. Cache write  non-fatal; staging files removed on success
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pitchlens::{AnalysisConfig, Analyzer, OpenAiClient, Pdftoppm};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::default();
//!     let chat = Arc::new(OpenAiClient::from_env()?);
//!     let analyzer = Analyzer::new(config, Arc::new(Pdftoppm::default()), chat, None)?;
//!
//!     let bytes = std::fs::read("deck.pdf")?;
//!     let output = analyzer.analyze(&bytes, None).await?;
//!     println!("{}", output.analysis);
//!     Ok(())
//! }
//! ```
//!
//! ## External collaborators
//!
//! The three expensive dependencies sit behind traits so they can be
//! swapped or mocked: [`Rasterizer`] (the `pdftoppm` binary),
//! [`ChatClient`] (an OpenAI-compatible chat/completions endpoint) and
//! [`EnrichmentClient`] (a company-data API). The shipped implementations
//! are [`Pdftoppm`], [`OpenAiClient`] and [`HarmonicClient`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod cache;
pub mod chat;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fingerprint;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{AnalysisOutput, AnalysisStats, Analyzer};
pub use cache::{AnalysisCache, CachedAnalysis};
pub use chat::ChatTurn;
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use enrich::{CompanyProfile, CondensedProfile, EnrichError, EnrichmentClient, HarmonicClient};
pub use error::PitchlensError;
pub use fingerprint::Fingerprint;
pub use llm::{ChatClient, ChatMessage, ChatResponse, CompletionOptions, OpenAiClient};
pub use pipeline::rasterize::{Pdftoppm, Rasterizer, SlideImage};
pub use report::{AnalysisReport, ReportSection};
pub use server::{router, run_server, AppState};

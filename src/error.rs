//! Error types for the pitchlens library.
//!
//! [`PitchlensError`] covers the *fatal* failures — those that abort an
//! analysis request and surface to the caller. Degradable failures are
//! deliberately absent from this enum and absorbed where they occur:
//!
//! * enrichment fetch/parse errors ([`crate::enrich::EnrichError`]) — logged,
//!   the report is produced from slide content alone;
//! * cache-write failures — logged, the computed report is still returned;
//! * staging-cleanup failures — logged, a later sweep can reclaim the files.
//!
//! The split keeps the propagation policy readable at call sites: anything
//! returned as `Err(PitchlensError)` ends the request, everything else is a
//! `warn!` and carries on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pitchlens library.
#[derive(Debug, Error)]
pub enum PitchlensError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The multipart form carried no file field.
    #[error("No file provided in the upload")]
    MissingUpload,

    /// The uploaded bytes are not a PDF.
    #[error("Uploaded file is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: [u8; 4] },

    /// A follow-up chat message carried a role other than user/assistant.
    #[error("Invalid chat role '{role}': expected 'user' or 'assistant'")]
    InvalidChatRole { role: String },

    // ── Rasterization errors ──────────────────────────────────────────────
    /// The external conversion process exited non-zero or could not start.
    #[error("PDF rasterization failed: {detail}")]
    RasterizationFailed { detail: String },

    /// The conversion process exited cleanly but produced no page images.
    #[error("Rasterizer produced no slide images in '{dir}'")]
    NoSlides { dir: PathBuf },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The chat API is not configured (missing API key etc.).
    #[error("Chat API is not configured.\n{hint}")]
    LlmNotConfigured { hint: String },

    /// The chat API returned an error or an empty completion.
    #[error("Chat API error: {message}")]
    LlmApi { message: String },

    // ── Enrichment errors (fatal only on the dedicated /enrich path) ─────
    /// No enrichment client was configured for this deployment.
    #[error("Company enrichment is not configured")]
    EnrichmentNotConfigured,

    /// The enrichment API resolved no company for the given domain.
    #[error("No company profile found for domain '{domain}'")]
    CompanyNotFound { domain: String },

    /// The enrichment API failed on the dedicated /enrich path, where there
    /// is nothing to degrade to.
    #[error("Company enrichment failed: {0}")]
    Enrichment(#[from] crate::enrich::EnrichError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A staging or cache directory could not be created at startup.
    #[error("Failed to create directory '{path}': {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A staging file (uploaded PDF, slide image) could not be written or read.
    #[error("Staging I/O failed for '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server could not bind its listen address.
    #[error("Failed to bind '{addr}': {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PitchlensError {
    /// Whether this error was caused by bad client input rather than a
    /// server-side failure. The HTTP layer maps these to 4xx responses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PitchlensError::MissingUpload
                | PitchlensError::NotAPdf { .. }
                | PitchlensError::InvalidChatRole { .. }
                | PitchlensError::EnrichmentNotConfigured
                | PitchlensError::CompanyNotFound { .. }
        )
    }
}

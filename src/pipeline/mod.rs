//! Pipeline stages for deck analysis.
//!
//! Each submodule implements exactly one transformation step, keeping the
//! stages independently testable and the orchestrator
//! ([`crate::analyze`]) a readable sequence of calls.
//!
//! ## Data Flow
//!
//! ```text
//! rasterize ──▶ batch ──▶ encode ──▶ summarize ──▶ synthesize
//! (pdftoppm)   (group 4)  (base64)   (vision LLM)  (final report)
//! ```
//!
//! 1. [`rasterize`]  — run the external converter, collect ordered slides
//! 2. [`batch`]      — partition slides into consecutive fixed-size groups
//! 3. [`encode`]     — read each slide PNG, wrap as a base64 data URI
//! 4. [`summarize`]  — one vision call per batch; observations joined in
//!    deck order (order is load-bearing: the deck's narrative is positional)
//! 5. [`synthesize`] — single final call merging slide narrative and the
//!    optional enrichment summary into the scored report

pub mod batch;
pub mod encode;
pub mod rasterize;
pub mod summarize;
pub mod synthesize;

//! Slide batching: fixed-size consecutive groups in deck order.
//!
//! The vision API bounds how much image payload one request can carry, so
//! the ordered slide list is cut into `ceil(N/K)` consecutive batches.
//! Consecutiveness matters more than balance: the deck's narrative logic
//! (problem → solution → market → team) is positional, and downstream
//! synthesis assumes the accumulated observations mirror page order.

use crate::pipeline::rasterize::SlideImage;

/// A size-bounded group of consecutive slides — the unit of work sent to
/// the vision model.
#[derive(Debug, Clone)]
pub struct AnalysisBatch {
    /// 0-based batch position; batch results are joined in this order.
    pub index: usize,
    /// At most `batch_size` consecutive slides.
    pub slides: Vec<SlideImage>,
}

impl AnalysisBatch {
    /// Inclusive slide-number range covered by this batch, for logging.
    pub fn slide_range(&self) -> (usize, usize) {
        let first = self.slides.first().map(|s| s.index).unwrap_or(0);
        let last = self.slides.last().map(|s| s.index).unwrap_or(0);
        (first, last)
    }
}

/// Partition ordered slides into consecutive batches of at most
/// `batch_size`. `batch_size` must be ≥ 1 (enforced by config validation).
pub fn partition(slides: &[SlideImage], batch_size: usize) -> Vec<AnalysisBatch> {
    slides
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| AnalysisBatch {
            index,
            slides: chunk.to_vec(),
        })
        .collect()
}

//! Slide encoding: PNG file → base64 data-URI attachment.
//!
//! Vision chat APIs accept images as base64 data URIs embedded in the JSON
//! request body. The slides are already PNG on disk (rasterizer output),
//! so encoding is read + base64 — no re-compression, keeping slide text
//! crisp for the model.

use crate::error::PitchlensError;
use crate::llm::ImageAttachment;
use crate::pipeline::rasterize::SlideImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Read a rasterized slide and wrap it as a high-detail image attachment.
pub async fn encode_slide(slide: &SlideImage) -> Result<ImageAttachment, PitchlensError> {
    let bytes = tokio::fs::read(&slide.path)
        .await
        .map_err(|e| PitchlensError::Staging {
            path: slide.path.clone(),
            source: e,
        })?;

    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded slide {} → {} bytes base64", slide.index, b64.len());

    Ok(ImageAttachment::png_base64(b64))
}

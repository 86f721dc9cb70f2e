//! PDF rasterization via the external `pdftoppm` utility.
//!
//! `pdftoppm -png -r {dpi} input.pdf {out_dir}/slide` writes one
//! `slide-N.png` per page (Poppler zero-pads N based on page count, so a
//! 12-page deck yields `slide-01.png` … `slide-12.png`). Slide order is
//! recovered by parsing the first digit run in each filename rather than
//! relying on lexicographic order, which breaks at `slide-9.png` vs
//! `slide-10.png` for unpadded output.
//!
//! The caller namespaces `out_dir` by fingerprint, so concurrent requests
//! for different decks never interleave their output files. A non-zero
//! exit or an empty output directory is fatal for the request — there is
//! no meaningful partial result for a deck whose pages never rendered.

use crate::error::PitchlensError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// One rasterized page, ordered by its position in the deck.
#[derive(Debug, Clone, Serialize)]
pub struct SlideImage {
    /// 1-based page number parsed from the output filename.
    pub index: usize,
    /// Location of the PNG on disk. Owned by the staging area; readers
    /// never mutate it.
    pub path: PathBuf,
}

/// The rasterization seam.
///
/// Production uses [`Pdftoppm`]; tests substitute an implementation that
/// writes fixture images and counts invocations.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render every page of `pdf_path` into `out_dir`, returning the
    /// slides sorted by page number. Must fail rather than return an
    /// empty list.
    async fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<SlideImage>, PitchlensError>;
}

/// [`Rasterizer`] backed by the Poppler `pdftoppm` binary.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    /// Binary name or path; default `pdftoppm` from `$PATH`.
    pub binary: String,
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Pdftoppm {
            binary: "pdftoppm".to_string(),
        }
    }
}

#[async_trait]
impl Rasterizer for Pdftoppm {
    async fn rasterize(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<SlideImage>, PitchlensError> {
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| PitchlensError::Staging {
                path: out_dir.to_path_buf(),
                source: e,
            })?;

        let prefix = out_dir.join("slide");
        info!(
            "Rasterizing {} at {} DPI into {}",
            pdf_path.display(),
            dpi,
            out_dir.display()
        );

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| PitchlensError::RasterizationFailed {
                detail: format!("failed to spawn '{}': {}", self.binary, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PitchlensError::RasterizationFailed {
                detail: format!(
                    "'{}' exited with {}: {}",
                    self.binary,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let slides = collect_slides(out_dir).await?;
        info!("Rasterized {} slides", slides.len());
        Ok(slides)
    }
}

/// Scan `out_dir` for PNG output and return slides sorted by page number.
pub async fn collect_slides(out_dir: &Path) -> Result<Vec<SlideImage>, PitchlensError> {
    let mut entries =
        tokio::fs::read_dir(out_dir)
            .await
            .map_err(|e| PitchlensError::Staging {
                path: out_dir.to_path_buf(),
                source: e,
            })?;

    let mut slides = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PitchlensError::Staging {
            path: out_dir.to_path_buf(),
            source: e,
        })?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        match parse_slide_index(&path) {
            Some(index) => {
                debug!("Slide {} ← {}", index, path.display());
                slides.push(SlideImage { index, path });
            }
            None => {
                debug!("Ignoring non-slide file {}", path.display());
            }
        }
    }

    if slides.is_empty() {
        return Err(PitchlensError::NoSlides {
            dir: out_dir.to_path_buf(),
        });
    }

    slides.sort_by_key(|s| s.index);
    Ok(slides)
}

/// Parse the page number from an output filename: the first run of digits
/// in the file stem (`slide-07` → 7, `slide-12` → 12).
fn parse_slide_index(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

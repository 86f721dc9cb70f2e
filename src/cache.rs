//! Content-addressable result cache.
//!
//! Maps a deck's [`Fingerprint`] to its finished analysis so re-uploading
//! the same bytes never repeats the rasterizer or any model call. One
//! JSON file per fingerprint under the cache directory; no index, no
//! eviction. Entries are write-once: a racing duplicate `put` is harmless
//! because the value for a fingerprint is a pure function of the input.
//!
//! `put` uses write-to-temp-then-rename so readers never observe a
//! half-written entry. `get` treats unreadable or corrupt entries as
//! misses — recomputing an analysis is always safe, failing a request
//! over a bad cache file is not.

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// A persisted analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAnalysis {
    /// The final analysis text, returned verbatim on a hit.
    pub analysis: String,
    /// Raw enrichment snapshot captured alongside the analysis, when the
    /// request carried a website and the fetch succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<serde_json::Value>,
    /// Unix epoch seconds at creation. Informational only — entries
    /// never expire.
    pub created_at: u64,
}

impl CachedAnalysis {
    /// Build an entry timestamped now.
    pub fn new(analysis: String, enrichment: Option<serde_json::Value>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        CachedAnalysis {
            analysis,
            enrichment,
            created_at,
        }
    }
}

/// File-backed fingerprint → analysis store.
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    dir: PathBuf,
}

impl AnalysisCache {
    /// Open the cache rooted at `dir`, creating the directory if needed.
    /// Safe to call when the directory already exists.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(AnalysisCache { dir })
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint.as_hex()))
    }

    /// Look up a previous analysis. Corrupt or unreadable entries are
    /// logged and reported as misses.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CachedAnalysis> {
        let path = self.entry_path(fingerprint);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(entry) => {
                debug!("Cache hit for {}", fingerprint);
                Some(entry)
            }
            Err(e) => {
                warn!("Corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Persist an analysis. Atomic (temp file + rename); the caller
    /// treats failure as non-fatal and still returns the computed result.
    pub async fn put(&self, fingerprint: &Fingerprint, entry: &CachedAnalysis) -> io::Result<()> {
        let path = self.entry_path(fingerprint);
        let tmp = path.with_extension("json.tmp");

        let raw = serde_json::to_vec_pretty(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&tmp, &raw).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Cached analysis for {}", fingerprint);
        Ok(())
    }
}

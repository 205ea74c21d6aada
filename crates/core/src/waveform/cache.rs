//! File-based cache of computed peak series.
//!
//! Entries are keyed by the SHA-256 of the audio bytes and the peak count,
//! so a track is only analyzed once per resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::peaks::PeakSeries;

/// Get the cache directory.
///
/// Uses `NOTETRACK_CACHE_DIR` env var if set, otherwise `~/.cache/notetrack`.
pub fn default_cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOTETRACK_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".cache").join("notetrack")
}

/// SHA-256 of a byte slice as a 64-character hex string.
pub fn bytes_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    peak_count: usize,
    duration_s: f64,
    peaks: PeakSeries,
}

/// Cached waveform for a track.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPeaks {
    pub peaks: PeakSeries,
    pub duration_s: f64,
}

/// Peak cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct PeakCache {
    root: PathBuf,
}

impl PeakCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, hash: &str, peak_count: usize) -> PathBuf {
        self.root
            .join("peaks")
            .join(format!("{}_{}.json", hash, peak_count))
    }

    /// Return cached peaks, or None on a miss or unreadable entry.
    pub fn get(&self, hash: &str, peak_count: usize) -> Option<CachedPeaks> {
        let path = self.entry_path(hash, peak_count);
        let data = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Ignoring corrupt peak cache entry {}: {}", path.display(), e);
                return None;
            }
        };
        if entry.peak_count != peak_count || entry.peaks.len() != peak_count {
            return None;
        }
        log::info!("Cache hit: peaks ({}...)", &hash[..12.min(hash.len())]);
        Some(CachedPeaks {
            peaks: entry.peaks,
            duration_s: entry.duration_s,
        })
    }

    /// Store peaks for a track.
    pub fn store(&self, hash: &str, peaks: &PeakSeries, duration_s: f64) -> Result<()> {
        let path = self.entry_path(hash, peaks.len());
        let entry = CacheEntry {
            peak_count: peaks.len(),
            duration_s,
            peaks: peaks.clone(),
        };
        let json = serde_json::to_string(&entry)?;
        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Failed to write peak cache: {}", path.display()))?;
        log::info!("Cached peaks ({}...)", &hash[..12.min(hash.len())]);
        Ok(())
    }
}

/// Atomically write data to a file via temp file + rename.
fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = target.with_extension("tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_hash() {
        let h = bytes_hash(b"hello world");
        assert_eq!(h.len(), 64);
        assert_eq!(
            h,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_ne!(h, bytes_hash(b"hello world!"));
    }

    #[test]
    fn test_store_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PeakCache::new(dir.path());
        let peaks = PeakSeries::new(vec![0.5, 1.0, 0.25]);

        assert!(cache.get("abc123", 3).is_none());
        cache.store("abc123", &peaks, 12.5).unwrap();

        let cached = cache.get("abc123", 3).unwrap();
        assert_eq!(cached.peaks, peaks);
        assert_eq!(cached.duration_s, 12.5);
        // Different resolution is a separate entry.
        assert!(cache.get("abc123", 1000).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PeakCache::new(dir.path());
        let path = cache.entry_path("deadbeef", 4);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert!(cache.get("deadbeef", 4).is_none());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PeakCache::new(dir.path());
        cache
            .store("cafe", &PeakSeries::new(vec![1.0]), 1.0)
            .unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path().join("peaks"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cafe_1.json".to_string()]);
    }
}

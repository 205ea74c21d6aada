//! User-tunable settings, stored as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::notes::activation::{DEFAULT_EXACT_EPSILON_S, DEFAULT_TOLERANCE_S};
use crate::waveform::cache::{default_cache_dir, PeakCache};
use crate::waveform::mapping::DEFAULT_HIT_TOLERANCE_PX;
use crate::waveform::peaks::DEFAULT_PEAK_COUNT;
use crate::waveform::render::Palette;

/// Settings shared by the CLI and the GUI.
///
/// Missing fields fall back to their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bars in the waveform.
    pub peak_count: usize,
    /// Seconds either side of the playhead in which a note is active.
    pub activation_tolerance_s: f64,
    /// Distance below which a note counts as "now".
    pub exact_match_epsilon_s: f64,
    /// Click radius around a note marker, logical pixels.
    pub hit_tolerance_px: f64,
    pub cache_enabled: bool,
    /// Overrides `NOTETRACK_CACHE_DIR` and the home-directory default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    pub palette: Palette,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            peak_count: DEFAULT_PEAK_COUNT,
            activation_tolerance_s: DEFAULT_TOLERANCE_S,
            exact_match_epsilon_s: DEFAULT_EXACT_EPSILON_S,
            hit_tolerance_px: DEFAULT_HIT_TOLERANCE_PX,
            cache_enabled: true,
            cache_dir: None,
            palette: Palette::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&data)
            .with_context(|| format!("Invalid settings file: {}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Read settings if the file exists, defaults otherwise.
    ///
    /// An unreadable or malformed file is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{:#}; using default settings", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }

    /// Replace out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.peak_count == 0 {
            self.peak_count = defaults.peak_count;
        }
        if !non_negative(self.activation_tolerance_s) {
            self.activation_tolerance_s = defaults.activation_tolerance_s;
        }
        if !(self.exact_match_epsilon_s.is_finite() && self.exact_match_epsilon_s > 0.0) {
            self.exact_match_epsilon_s = defaults.exact_match_epsilon_s;
        }
        if !non_negative(self.hit_tolerance_px) {
            self.hit_tolerance_px = defaults.hit_tolerance_px;
        }
        self
    }

    /// The peak cache these settings call for, if caching is on.
    pub fn cache(&self) -> Option<PeakCache> {
        if !self.cache_enabled {
            return None;
        }
        let dir = self.cache_dir.clone().unwrap_or_else(default_cache_dir);
        Some(PeakCache::new(dir))
    }
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.peak_count, 1000);
        assert_eq!(s.activation_tolerance_s, 3.0);
        assert_eq!(s.exact_match_epsilon_s, 0.5);
        assert_eq!(s.hit_tolerance_px, 10.0);
        assert!(s.cache_enabled);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"peak_count": 200}"#).unwrap();
        assert_eq!(s.peak_count, 200);
        assert_eq!(s.activation_tolerance_s, 3.0);
        assert_eq!(s.palette, Palette::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = Settings::default();
        s.activation_tolerance_s = 5.0;
        s.cache_enabled = false;
        s.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), s);
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(Settings::load_or_default(&path), Settings::default());
        std::fs::write(&path, "not json").unwrap();
        assert!(Settings::load(&path).is_err());
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }

    #[test]
    fn test_sanitized() {
        let s = Settings {
            peak_count: 0,
            activation_tolerance_s: -1.0,
            exact_match_epsilon_s: f64::NAN,
            hit_tolerance_px: 4.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.peak_count, 1000);
        assert_eq!(s.activation_tolerance_s, 3.0);
        assert_eq!(s.exact_match_epsilon_s, 0.5);
        assert_eq!(s.hit_tolerance_px, 4.0);

        // A zero epsilon would never report a note as "now".
        let s = Settings {
            exact_match_epsilon_s: 0.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.exact_match_epsilon_s, 0.5);
    }

    #[test]
    fn test_cache_toggle() {
        let mut s = Settings {
            cache_dir: Some(PathBuf::from("/tmp/notetrack-test-cache")),
            ..Default::default()
        };
        assert_eq!(
            s.cache().unwrap().root(),
            Path::new("/tmp/notetrack-test-cache")
        );
        s.cache_enabled = false;
        assert!(s.cache().is_none());
    }
}

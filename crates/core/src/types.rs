use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a loaded audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Snapshot of the transport, read by the core on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Playback position in seconds.
    pub current_time: f64,
    /// Track length in seconds.
    pub duration: f64,
    pub is_playing: bool,
    /// Output gain in [0, 1].
    pub volume: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            volume: 1.0,
        }
    }
}

impl PlaybackState {
    /// Fraction of the track already played, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 && self.current_time.is_finite() {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_state_defaults() {
        let state = PlaybackState::default();
        assert_eq!(state.current_time, 0.0);
        assert!(!state.is_playing);
        assert_eq!(state.volume, 1.0);
    }

    #[test]
    fn test_progress_guards_zero_duration() {
        let state = PlaybackState {
            current_time: 5.0,
            ..Default::default()
        };
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn test_progress_clamped() {
        let state = PlaybackState {
            current_time: 12.0,
            duration: 10.0,
            ..Default::default()
        };
        assert_eq!(state.progress(), 1.0);
    }

    #[test]
    fn test_track_ids_unique() {
        assert_ne!(TrackId::new(), TrackId::new());
    }
}

//! Note data model.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TrackId;

/// Unique identifier for a note.
pub type NoteId = Uuid;

/// A timestamped text annotation on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub track_id: TrackId,
    /// Position on the track in seconds.
    pub timestamp: f64,
    pub content: String,
    /// Marker color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Unix milliseconds.
    pub created_at: u64,
    /// Unix milliseconds.
    pub updated_at: u64,
}

impl Note {
    pub fn new(track_id: TrackId, timestamp: f64, content: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            track_id,
            timestamp,
            content: content.into(),
            color: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Whether the timestamp can be placed on a timeline at all.
    pub fn has_valid_timestamp(&self) -> bool {
        self.timestamp.is_finite() && self.timestamp >= 0.0
    }

    /// Distance in seconds between this note and a playback position.
    pub fn distance_to(&self, time: f64) -> f64 {
        (self.timestamp - time).abs()
    }
}

/// Partial update for a note. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub content: Option<String>,
    /// `Some(None)` clears the color.
    #[serde(default)]
    pub color: Option<Option<String>>,
}

impl NotePatch {
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none() && self.content.is_none() && self.color.is_none()
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

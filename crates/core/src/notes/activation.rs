//! Time-windowed note activation and ranking.

use super::types::Note;

/// Default activation window in seconds.
pub const DEFAULT_TOLERANCE_S: f64 = 3.0;

/// Distance below which a note counts as happening now.
pub const DEFAULT_EXACT_EPSILON_S: f64 = 0.5;

/// Notes near the playback position, closest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveNoteSet<'a> {
    notes: Vec<&'a Note>,
}

impl<'a> ActiveNoteSet<'a> {
    pub fn empty() -> Self {
        Self { notes: Vec::new() }
    }

    /// The note surfaced prominently.
    pub fn primary(&self) -> Option<&'a Note> {
        self.notes.first().copied()
    }

    /// Number of active notes beyond the primary one.
    pub fn more_count(&self) -> usize {
        self.notes.len().saturating_sub(1)
    }

    /// "+N more" label, or `None` when only the primary is active.
    pub fn more_label(&self) -> Option<String> {
        match self.more_count() {
            0 => None,
            n => Some(format!("+{} more", n)),
        }
    }

    pub fn notes(&self) -> &[&'a Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Select the notes within `tolerance` seconds of `current_time`.
///
/// Nothing is active while paused. Ordered by distance from `current_time`,
/// ties by ascending timestamp. Notes with unusable timestamps are skipped.
pub fn active_notes(
    notes: &[Note],
    current_time: f64,
    is_playing: bool,
    tolerance: f64,
) -> ActiveNoteSet<'_> {
    if !is_playing || !current_time.is_finite() || tolerance.is_nan() || tolerance < 0.0 {
        return ActiveNoteSet::empty();
    }

    let mut active: Vec<&Note> = notes
        .iter()
        .filter(|n| n.has_valid_timestamp())
        .filter(|n| n.distance_to(current_time) <= tolerance)
        .collect();

    active.sort_by(|a, b| {
        a.distance_to(current_time)
            .total_cmp(&b.distance_to(current_time))
            .then(a.timestamp.total_cmp(&b.timestamp))
    });

    ActiveNoteSet { notes: active }
}

/// Whether a note is close enough to count as "now".
pub fn is_exact_match(note: &Note, current_time: f64, epsilon: f64) -> bool {
    let distance = note.distance_to(current_time);
    distance == 0.0 || distance < epsilon
}

/// Signed seconds until the note: positive is upcoming, negative is past.
pub fn time_until(note: &Note, current_time: f64) -> f64 {
    note.timestamp - current_time
}

/// Human-readable offset such as "in 3s", "2s ago" or "now".
pub fn relative_label(seconds_until: f64, epsilon: f64) -> String {
    if seconds_until == 0.0 || seconds_until.abs() < epsilon {
        "now".to_string()
    } else if seconds_until > 0.0 {
        format!("in {:.0}s", seconds_until.ceil())
    } else {
        format!("{:.0}s ago", (-seconds_until).ceil())
    }
}

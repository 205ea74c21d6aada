//! Conversions between playback time and horizontal pixel position.

use crate::notes::Note;

/// Default hit radius around a note marker, in logical pixels.
pub const DEFAULT_HIT_TOLERANCE_PX: f64 = 10.0;

fn degenerate(width: f64, duration: f64) -> bool {
    !(width.is_finite() && duration.is_finite()) || width <= 0.0 || duration <= 0.0
}

/// Map a time in seconds to an x position.
///
/// Returns 0 when the viewport or the track has no extent.
pub fn time_to_x(time: f64, width: f64, duration: f64) -> f64 {
    if degenerate(width, duration) || !time.is_finite() {
        return 0.0;
    }
    time / duration * width
}

/// Map an x position back to a time in seconds.
pub fn x_to_time(x: f64, width: f64, duration: f64) -> f64 {
    if degenerate(width, duration) || !x.is_finite() {
        return 0.0;
    }
    x / width * duration
}

/// Time at `x`, clamped to the track for seeking.
pub fn seek_time_at(x: f64, width: f64, duration: f64) -> f64 {
    x_to_time(x, width, duration).clamp(0.0, duration.max(0.0))
}

/// Find the note whose marker lies within `tolerance_px` of `x`.
///
/// Notes are scanned in ascending timestamp order and the first hit wins.
pub fn hit_test_note<'a>(
    x: f64,
    notes: &'a [Note],
    width: f64,
    duration: f64,
    tolerance_px: f64,
) -> Option<&'a Note> {
    if degenerate(width, duration) {
        return None;
    }
    let mut candidates: Vec<&Note> = notes.iter().filter(|n| n.has_valid_timestamp()).collect();
    candidates.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    candidates
        .into_iter()
        .find(|n| (time_to_x(n.timestamp, width, duration) - x).abs() <= tolerance_px)
}

//! Reactive primary-note selection driven by the playback clock.

use serde::Serialize;

use super::activation::{
    active_notes, is_exact_match, relative_label, time_until, DEFAULT_EXACT_EPSILON_S,
    DEFAULT_TOLERANCE_S,
};
use super::types::{Note, NoteId};
use crate::types::PlaybackState;

/// Which note, if any, is currently surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    #[default]
    Idle,
    Primary(NoteId),
}

/// A change in the surfaced note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationEvent {
    Appeared(NoteId),
    Switched { previous: NoteId, current: NoteId },
    Cleared { previous: NoteId },
}

/// Display data for the primary note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteCard {
    pub note: Note,
    /// Active notes beyond this one. Only the count is exposed.
    pub more_count: usize,
    /// Within the exact-match epsilon of the playback position.
    pub is_now: bool,
    /// Signed seconds until the note.
    pub time_until: f64,
    /// "now", "in 3s", "2s ago".
    pub label: String,
}

impl NoteCard {
    pub fn more_label(&self) -> Option<String> {
        (self.more_count > 0).then(|| format!("+{} more", self.more_count))
    }
}

/// Output of one engine update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivationFrame {
    pub card: Option<NoteCard>,
    pub event: Option<ActivationEvent>,
}

/// Tracks the primary note across clock ticks.
///
/// The only retained state is the id of the last primary note, used to
/// suppress duplicate appearance events while the same note stays closest.
#[derive(Debug, Clone)]
pub struct NoteActivationEngine {
    tolerance: f64,
    exact_epsilon: f64,
    state: ActivationState,
    disposed: bool,
}

impl Default for NoteActivationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_S, DEFAULT_EXACT_EPSILON_S)
    }
}

impl NoteActivationEngine {
    pub fn new(tolerance: f64, exact_epsilon: f64) -> Self {
        Self {
            tolerance,
            exact_epsilon,
            state: ActivationState::Idle,
            disposed: false,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// Recompute the primary note for the given snapshot and clock.
    ///
    /// Call on every clock tick and after every note collection change.
    pub fn update(&mut self, notes: &[Note], playback: &PlaybackState) -> ActivationFrame {
        if self.disposed {
            return ActivationFrame::default();
        }

        let now = playback.current_time;
        let active = active_notes(notes, now, playback.is_playing, self.tolerance);
        let card = active.primary().map(|primary| {
            let until = time_until(primary, now);
            NoteCard {
                note: primary.clone(),
                more_count: active.more_count(),
                is_now: is_exact_match(primary, now, self.exact_epsilon),
                time_until: until,
                label: relative_label(until, self.exact_epsilon),
            }
        });

        let next = match &card {
            Some(c) => ActivationState::Primary(c.note.id),
            None => ActivationState::Idle,
        };
        let event = transition(self.state, next);
        if let Some(ev) = event {
            log::debug!("Note activation: {:?}", ev);
        }
        self.state = next;

        ActivationFrame { card, event }
    }

    /// Stop reacting; later updates produce idle frames without events.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.state = ActivationState::Idle;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

fn transition(from: ActivationState, to: ActivationState) -> Option<ActivationEvent> {
    match (from, to) {
        (ActivationState::Idle, ActivationState::Idle) => None,
        (ActivationState::Idle, ActivationState::Primary(id)) => Some(ActivationEvent::Appeared(id)),
        (ActivationState::Primary(previous), ActivationState::Idle) => {
            Some(ActivationEvent::Cleared { previous })
        }
        (ActivationState::Primary(previous), ActivationState::Primary(current)) => {
            (previous != current).then_some(ActivationEvent::Switched { previous, current })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackId;

    fn playing_at(t: f64) -> PlaybackState {
        PlaybackState {
            current_time: t,
            duration: 60.0,
            is_playing: true,
            volume: 1.0,
        }
    }

    fn make_notes(times: &[f64]) -> Vec<Note> {
        let track = TrackId::new();
        times
            .iter()
            .map(|&t| Note::new(track, t, format!("at {}", t)))
            .collect()
    }

    #[test]
    fn test_idle_when_paused() {
        let notes = make_notes(&[5.0]);
        let mut engine = NoteActivationEngine::default();
        let paused = PlaybackState {
            is_playing: false,
            ..playing_at(5.0)
        };
        let frame = engine.update(&notes, &paused);
        assert!(frame.card.is_none());
        assert!(frame.event.is_none());
        assert_eq!(engine.state(), ActivationState::Idle);
    }

    #[test]
    fn test_appear_switch_clear_sequence() {
        let notes = make_notes(&[10.0, 20.0]);
        let (a, b) = (notes[0].id, notes[1].id);
        let mut engine = NoteActivationEngine::new(3.0, 0.5);

        assert!(engine.update(&notes, &playing_at(0.0)).event.is_none());

        let frame = engine.update(&notes, &playing_at(8.0));
        assert_eq!(frame.event, Some(ActivationEvent::Appeared(a)));
        let card = frame.card.unwrap();
        assert_eq!(card.label, "in 2s");
        assert!(!card.is_now);

        // Same primary: no duplicate event.
        let frame = engine.update(&notes, &playing_at(10.1));
        assert!(frame.event.is_none());
        assert!(frame.card.unwrap().is_now);

        let frame = engine.update(&notes, &playing_at(18.0));
        assert_eq!(
            frame.event,
            Some(ActivationEvent::Switched {
                previous: a,
                current: b
            })
        );

        let frame = engine.update(&notes, &playing_at(40.0));
        assert_eq!(frame.event, Some(ActivationEvent::Cleared { previous: b }));
        assert!(frame.card.is_none());
        assert_eq!(engine.state(), ActivationState::Idle);
    }

    #[test]
    fn test_pause_clears_primary() {
        let notes = make_notes(&[10.0]);
        let mut engine = NoteActivationEngine::default();
        engine.update(&notes, &playing_at(10.0));
        let paused = PlaybackState {
            is_playing: false,
            ..playing_at(10.0)
        };
        let frame = engine.update(&notes, &paused);
        assert_eq!(
            frame.event,
            Some(ActivationEvent::Cleared {
                previous: notes[0].id
            })
        );
    }

    #[test]
    fn test_more_count_only() {
        let notes = make_notes(&[10.0, 11.0, 12.0]);
        let mut engine = NoteActivationEngine::new(3.0, 0.5);
        let card = engine.update(&notes, &playing_at(11.0)).card.unwrap();
        assert_eq!(card.note.timestamp, 11.0);
        assert_eq!(card.more_count, 2);
        assert_eq!(card.more_label().as_deref(), Some("+2 more"));
    }

    #[test]
    fn test_note_collection_change_reevaluates() {
        let mut notes = make_notes(&[10.0]);
        let mut engine = NoteActivationEngine::default();
        engine.update(&notes, &playing_at(10.0));

        let closer = Note::new(notes[0].track_id, 10.2, "closer");
        let closer_id = closer.id;
        notes.push(closer);
        let frame = engine.update(&notes, &playing_at(10.25));
        assert_eq!(
            frame.event,
            Some(ActivationEvent::Switched {
                previous: notes[0].id,
                current: closer_id
            })
        );

        notes.retain(|n| n.id != closer_id);
        let frame = engine.update(&notes, &playing_at(10.25));
        assert!(matches!(frame.event, Some(ActivationEvent::Switched { .. })));
    }

    #[test]
    fn test_disposed_engine_is_inert() {
        let notes = make_notes(&[10.0]);
        let mut engine = NoteActivationEngine::default();
        engine.dispose();
        let frame = engine.update(&notes, &playing_at(10.0));
        assert_eq!(frame, ActivationFrame::default());
        assert!(engine.is_disposed());
    }
}

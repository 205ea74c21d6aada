//! Read-only inspection of the note store and a running session.

use serde::Serialize;

use crate::notes::store::NoteStore;
use crate::notes::types::Note;
use crate::session::SessionDiagnostics;
use crate::types::TrackId;

/// Summary of one track's notes.
#[derive(Debug, Clone, Serialize)]
pub struct TrackNotesSummary {
    pub track_id: TrackId,
    pub note_count: usize,
    /// First and last note timestamps.
    pub span: Option<(f64, f64)>,
    /// Notes whose timestamp is NaN, infinite or negative.
    pub invalid_timestamps: usize,
}

/// Everything the facade can see, serializable for dumping.
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub tracks: Vec<TrackNotesSummary>,
    pub total_notes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDiagnostics>,
}

/// Inspection helpers over an injected store.
pub struct DebugFacade<'a> {
    store: &'a dyn NoteStore,
    session: Option<SessionDiagnostics>,
}

impl<'a> DebugFacade<'a> {
    pub fn new(store: &'a dyn NoteStore) -> Self {
        Self {
            store,
            session: None,
        }
    }

    /// Include a session's diagnostics in snapshots.
    pub fn with_session(mut self, diagnostics: SessionDiagnostics) -> Self {
        self.session = Some(diagnostics);
        self
    }

    pub fn notes_for(&self, track_id: TrackId) -> Vec<Note> {
        self.store.list(track_id)
    }

    pub fn summarize(&self, track_id: TrackId) -> TrackNotesSummary {
        let notes = self.store.list(track_id);
        let valid: Vec<f64> = notes
            .iter()
            .filter(|n| n.has_valid_timestamp())
            .map(|n| n.timestamp)
            .collect();
        let lo = valid.iter().copied().reduce(f64::min);
        let hi = valid.iter().copied().reduce(f64::max);
        let span = lo.zip(hi);
        TrackNotesSummary {
            track_id,
            note_count: notes.len(),
            span,
            invalid_timestamps: notes.len() - valid.len(),
        }
    }

    pub fn snapshot(&self) -> DebugSnapshot {
        let tracks: Vec<TrackNotesSummary> = self
            .store
            .tracks()
            .into_iter()
            .map(|id| self.summarize(id))
            .collect();
        let total_notes = tracks.iter().map(|t| t.note_count).sum();
        DebugSnapshot {
            tracks,
            total_notes,
            session: self.session.clone(),
        }
    }

    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

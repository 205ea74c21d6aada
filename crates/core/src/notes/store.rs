//! Note store contract and an in-memory implementation.

use std::collections::HashMap;

use crate::error::NoteStoreError;
use crate::types::TrackId;

use super::types::{now_millis, Note, NoteId, NotePatch};

/// Record store for notes. Callers treat returned vectors as snapshots.
pub trait NoteStore {
    /// All notes for a track, ordered by timestamp.
    fn list(&self, track_id: TrackId) -> Vec<Note>;

    fn create(
        &mut self,
        track_id: TrackId,
        timestamp: f64,
        content: &str,
        color: Option<String>,
    ) -> Result<Note, NoteStoreError>;

    fn update(&mut self, id: NoteId, patch: NotePatch) -> Result<(), NoteStoreError>;

    fn delete(&mut self, id: NoteId) -> Result<(), NoteStoreError>;

    /// Look up a single note.
    fn get(&self, id: NoteId) -> Option<Note>;

    /// Every track with at least one note.
    fn tracks(&self) -> Vec<TrackId>;
}

/// Notes held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNoteStore {
    notes: HashMap<NoteId, Note>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously exported notes.
    pub fn from_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        Self {
            notes: notes.into_iter().map(|n| (n.id, n)).collect(),
        }
    }

    /// Every note in the store, ordered by track then timestamp.
    pub fn all(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self.notes.values().cloned().collect();
        notes.sort_by(|a, b| {
            a.track_id
                .cmp(&b.track_id)
                .then(a.timestamp.total_cmp(&b.timestamp))
        });
        notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

fn validate_timestamp(timestamp: f64) -> Result<(), NoteStoreError> {
    if timestamp.is_finite() && timestamp >= 0.0 {
        Ok(())
    } else {
        Err(NoteStoreError::InvalidTimestamp(timestamp))
    }
}

fn validate_content(content: &str) -> Result<String, NoteStoreError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Err(NoteStoreError::EmptyContent)
    } else {
        Ok(trimmed.to_string())
    }
}

impl NoteStore for InMemoryNoteStore {
    fn list(&self, track_id: TrackId) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .notes
            .values()
            .filter(|n| n.track_id == track_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        notes
    }

    fn create(
        &mut self,
        track_id: TrackId,
        timestamp: f64,
        content: &str,
        color: Option<String>,
    ) -> Result<Note, NoteStoreError> {
        validate_timestamp(timestamp)?;
        let content = validate_content(content)?;
        let mut note = Note::new(track_id, timestamp, content);
        note.color = color;
        self.notes.insert(note.id, note.clone());
        log::debug!("Created note {} at {:.3}s", note.id, timestamp);
        Ok(note)
    }

    fn update(&mut self, id: NoteId, patch: NotePatch) -> Result<(), NoteStoreError> {
        if let Some(ts) = patch.timestamp {
            validate_timestamp(ts)?;
        }
        let content = patch.content.as_deref().map(validate_content).transpose()?;

        let note = self.notes.get_mut(&id).ok_or(NoteStoreError::NotFound(id))?;
        if let Some(ts) = patch.timestamp {
            note.timestamp = ts;
        }
        if let Some(content) = content {
            note.content = content;
        }
        if let Some(color) = patch.color {
            note.color = color;
        }
        note.updated_at = now_millis().max(note.created_at);
        Ok(())
    }

    fn delete(&mut self, id: NoteId) -> Result<(), NoteStoreError> {
        self.notes
            .remove(&id)
            .map(|_| ())
            .ok_or(NoteStoreError::NotFound(id))
    }

    fn get(&self, id: NoteId) -> Option<Note> {
        self.notes.get(&id).cloned()
    }

    fn tracks(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.notes.values().map(|n| n.track_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_create_and_list_sorted() {
        let mut store = InMemoryNoteStore::new();
        let track = TrackId::new();
        store.create(track, 30.0, "outro", None).unwrap();
        store.create(track, 10.0, "verse", None).unwrap();
        store.create(TrackId::new(), 5.0, "other track", None).unwrap();

        let notes = store.list(track);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].content, "verse");
        assert_eq!(notes[1].content, "outro");
    }

    #[test]
    fn test_create_rejects_empty_content() {
        let mut store = InMemoryNoteStore::new();
        let err = store.create(TrackId::new(), 1.0, "   ", None).unwrap_err();
        assert_eq!(err, NoteStoreError::EmptyContent);
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_rejects_bad_timestamp() {
        let mut store = InMemoryNoteStore::new();
        let track = TrackId::new();
        assert!(matches!(
            store.create(track, -0.5, "x", None),
            Err(NoteStoreError::InvalidTimestamp(_))
        ));
        assert!(store.create(track, f64::NAN, "x", None).is_err());
    }

    #[test]
    fn test_create_trims_content() {
        let mut store = InMemoryNoteStore::new();
        let note = store.create(TrackId::new(), 1.0, "  hello \n", None).unwrap();
        assert_eq!(note.content, "hello");
    }

    #[test]
    fn test_update_partial_fields() {
        let mut store = InMemoryNoteStore::new();
        let track = TrackId::new();
        let note = store
            .create(track, 4.0, "drop", Some("#ff0000".into()))
            .unwrap();

        store
            .update(
                note.id,
                NotePatch {
                    content: Some("big drop".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let updated = store.get(note.id).unwrap();
        assert_eq!(updated.content, "big drop");
        assert_eq!(updated.timestamp, 4.0);
        assert_eq!(updated.color.as_deref(), Some("#ff0000"));
        assert!(updated.updated_at >= updated.created_at);

        store
            .update(
                note.id,
                NotePatch {
                    color: Some(None),
                    timestamp: Some(6.0),
                    ..Default::default()
                },
            )
            .unwrap();
        let updated = store.get(note.id).unwrap();
        assert!(updated.color.is_none());
        assert_eq!(updated.timestamp, 6.0);
    }

    #[test]
    fn test_update_invalid_patch_leaves_note_untouched() {
        let mut store = InMemoryNoteStore::new();
        let note = store.create(TrackId::new(), 4.0, "keep", None).unwrap();
        let result = store.update(
            note.id,
            NotePatch {
                timestamp: Some(8.0),
                content: Some("".into()),
                ..Default::default()
            },
        );
        assert_eq!(result, Err(NoteStoreError::EmptyContent));
        assert_eq!(store.get(note.id).unwrap(), note);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let mut store = InMemoryNoteStore::new();
        let id = Uuid::new_v4();
        assert_eq!(
            store.update(id, NotePatch::default()),
            Err(NoteStoreError::NotFound(id))
        );
        assert_eq!(store.delete(id), Err(NoteStoreError::NotFound(id)));
    }

    #[test]
    fn test_delete() {
        let mut store = InMemoryNoteStore::new();
        let track = TrackId::new();
        let note = store.create(track, 1.0, "gone soon", None).unwrap();
        store.delete(note.id).unwrap();
        assert!(store.list(track).is_empty());
        assert!(store.get(note.id).is_none());
    }

    #[test]
    fn test_list_is_snapshot() {
        let mut store = InMemoryNoteStore::new();
        let track = TrackId::new();
        let note = store.create(track, 1.0, "first", None).unwrap();
        let snapshot = store.list(track);
        store.delete(note.id).unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_tracks_and_from_notes() {
        let a = TrackId::new();
        let b = TrackId::new();
        let store = InMemoryNoteStore::from_notes(vec![
            Note::new(a, 1.0, "a1"),
            Note::new(a, 2.0, "a2"),
            Note::new(b, 1.0, "b1"),
        ]);
        assert_eq!(store.len(), 3);
        let tracks = store.tracks();
        assert_eq!(tracks.len(), 2);
        assert!(tracks.contains(&a) && tracks.contains(&b));
        assert_eq!(store.all().len(), 3);
    }
}

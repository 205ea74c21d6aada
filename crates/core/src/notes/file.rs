//! JSON export of one track's notes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::store::{InMemoryNoteStore, NoteStore};
use super::types::Note;
use crate::types::TrackId;

/// Notes for one track, as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesFile {
    pub track: TrackId,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl NotesFile {
    pub fn new(track: TrackId) -> Self {
        Self {
            track,
            notes: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read notes: {}", path.display()))?;
        let file: NotesFile = serde_json::from_str(&data)
            .with_context(|| format!("Invalid notes file: {}", path.display()))?;
        Ok(file)
    }

    /// Load the file, or start an empty one for a new track if it is missing.
    pub fn load_or_new(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("{} does not exist; starting a new note list", path.display());
            Ok(Self::new(TrackId::new()))
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write notes: {}", path.display()))?;
        Ok(())
    }

    /// Snapshot a track's notes from a store.
    pub fn from_store(track: TrackId, store: &dyn NoteStore) -> Self {
        Self {
            track,
            notes: store.list(track),
        }
    }

    /// Load the notes into a fresh store.
    ///
    /// Notes recorded against a different track are re-attached to this one.
    pub fn into_store(self) -> InMemoryNoteStore {
        let track = self.track;
        InMemoryNoteStore::from_notes(self.notes.into_iter().map(|mut n| {
            n.track_id = track;
            n
        }))
    }
}

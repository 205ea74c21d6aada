//! Notes: data model, store contract, and playback-synchronized activation.

pub mod activation;
pub mod engine;
pub mod file;
pub mod store;
pub mod types;

pub use activation::{active_notes, is_exact_match, time_until, ActiveNoteSet};
pub use engine::{ActivationEvent, ActivationFrame, ActivationState, NoteActivationEngine, NoteCard};
pub use file::NotesFile;
pub use store::{InMemoryNoteStore, NoteStore};
pub use types::{Note, NoteId, NotePatch};

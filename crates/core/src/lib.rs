//! Core of notetrack: waveform analysis and rendering, plus
//! playback-synchronized surfacing of timestamped notes.

pub mod audio;
pub mod config;
pub mod debug;
pub mod error;
pub mod notes;
pub mod session;
pub mod types;
pub mod waveform;

pub use config::Settings;
pub use debug::DebugFacade;
pub use error::{DecodeError, NoteStoreError, RenderTargetUnavailable};
pub use notes::{Note, NoteId, NotePatch};
pub use session::{Session, SessionFrame, WaveformStatus};
pub use types::{PlaybackState, TrackId};

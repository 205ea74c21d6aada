//! Error types surfaced by the core.

use thiserror::Error;

use crate::notes::NoteId;

/// Audio could not be turned into samples.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("audio data is empty")]
    Empty,
    #[error("unsupported audio format: {0}")]
    Unsupported(String),
    #[error("no audio track found")]
    NoAudioTrack,
    #[error("corrupt audio stream: {0}")]
    Corrupt(String),
    #[error("no audio decoded")]
    NoSamples,
}

/// The viewport was torn down while a frame was being produced.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("render target unavailable")]
pub struct RenderTargetUnavailable;

/// Failed note operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NoteStoreError {
    #[error("note {0} not found")]
    NotFound(NoteId),
    #[error("note content must not be empty")]
    EmptyContent,
    #[error("invalid note timestamp: {0}")]
    InvalidTimestamp(f64),
    /// Notes can only be attached to a loaded track.
    #[error("no track loaded")]
    NoTrackLoaded,
}

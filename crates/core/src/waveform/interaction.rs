//! Pointer handling on the waveform surface.
//!
//! Events come in as logical x positions; outcomes go out as requests that
//! the host executes (seek on the transport, create a note in the store).

use super::mapping::{hit_test_note, seek_time_at, x_to_time, DEFAULT_HIT_TOLERANCE_PX};
use crate::notes::{Note, NoteId};

/// Pointer input on the waveform, x in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Click { x: f64 },
    DoubleClick { x: f64 },
    Move { x: f64 },
    Leave,
}

/// Action the host should carry out in response to a pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionRequest {
    Seek(f64),
    CreateNote { timestamp: f64 },
    SelectionChanged(Option<NoteId>),
}

/// Selection and hover state for one waveform view.
#[derive(Debug, Clone)]
pub struct WaveformInteraction {
    selected: Option<NoteId>,
    hover_time: Option<f64>,
    hit_tolerance_px: f64,
}

impl Default for WaveformInteraction {
    fn default() -> Self {
        Self::new(DEFAULT_HIT_TOLERANCE_PX)
    }
}

impl WaveformInteraction {
    pub fn new(hit_tolerance_px: f64) -> Self {
        Self {
            selected: None,
            hover_time: None,
            hit_tolerance_px,
        }
    }

    pub fn selected(&self) -> Option<NoteId> {
        self.selected
    }

    pub fn hover_time(&self) -> Option<f64> {
        self.hover_time
    }

    pub fn select(&mut self, id: Option<NoteId>) {
        self.selected = id;
    }

    /// Forget selection and hover, e.g. when a new track replaces the old one.
    pub fn reset(&mut self) {
        self.selected = None;
        self.hover_time = None;
    }

    /// Drop the selection if the selected note no longer exists.
    pub fn retain_selection(&mut self, notes: &[Note]) -> bool {
        match self.selected {
            Some(id) if !notes.iter().any(|n| n.id == id) => {
                self.selected = None;
                true
            }
            _ => false,
        }
    }

    /// Apply one pointer event.
    ///
    /// A click on a marker toggles its selection, a click elsewhere seeks, a
    /// double click always requests a new note. Movement only updates the
    /// hover guide.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        notes: &[Note],
        width: f64,
        duration: f64,
    ) -> Option<InteractionRequest> {
        match event {
            PointerEvent::Click { x } => {
                if let Some(hit) = hit_test_note(x, notes, width, duration, self.hit_tolerance_px) {
                    self.selected = if self.selected == Some(hit.id) {
                        None
                    } else {
                        Some(hit.id)
                    };
                    Some(InteractionRequest::SelectionChanged(self.selected))
                } else {
                    Some(InteractionRequest::Seek(seek_time_at(x, width, duration)))
                }
            }
            PointerEvent::DoubleClick { x } => Some(InteractionRequest::CreateNote {
                timestamp: seek_time_at(x, width, duration),
            }),
            PointerEvent::Move { x } => {
                self.hover_time = Some(x_to_time(x, width, duration));
                None
            }
            PointerEvent::Leave => {
                self.hover_time = None;
                None
            }
        }
    }
}

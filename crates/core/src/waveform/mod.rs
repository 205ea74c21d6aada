//! Waveform engine: peak extraction, coordinate mapping, rendering and
//! pointer interaction.

pub mod cache;
pub mod interaction;
pub mod loader;
pub mod mapping;
pub mod peaks;
pub mod render;

pub use interaction::{InteractionRequest, PointerEvent, WaveformInteraction};
pub use loader::{analyze, LoadedTrack, TrackSource, WaveformLoader};
pub use mapping::{hit_test_note, seek_time_at, time_to_x, x_to_time};
pub use peaks::{compute_peaks, extract_peaks, normalize, PeakSeries};
pub use render::{render, DrawCommand, DrawList, Palette, RenderInput, Rgba, Viewport};

//! Audio decoding and playback transport.

pub mod decode;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod playback;
pub mod transport;

pub use decode::{decode, DecodedAudio};
pub use playback::PlaybackEngine;
pub use transport::{ManualTransport, Transport};

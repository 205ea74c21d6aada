//! Transport contract and a manually clocked implementation.

use std::sync::Arc;

use super::decode::DecodedAudio;
use crate::types::PlaybackState;

/// Playback controller. The core reads its state and issues seeks; it never
/// advances the clock itself.
pub trait Transport {
    /// Replace the loaded track and rewind to the start.
    fn load_audio(&mut self, audio: Arc<DecodedAudio>);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, time: f64);
    fn set_volume(&mut self, volume: f32);
    fn state(&self) -> PlaybackState;

    fn toggle(&mut self) {
        if self.state().is_playing {
            self.pause();
        } else {
            self.play();
        }
    }
}

/// A transport whose clock only moves when `advance` is called.
///
/// Drives deterministic previews and tests without an audio device.
#[derive(Debug, Clone, Default)]
pub struct ManualTransport {
    state: PlaybackState,
}

impl ManualTransport {
    pub fn new(duration: f64) -> Self {
        Self {
            state: PlaybackState {
                duration: duration.max(0.0),
                ..Default::default()
            },
        }
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.state.duration = duration.max(0.0);
        self.state.current_time = self.state.current_time.min(self.state.duration);
    }

    /// Move the clock forward by `dt` seconds while playing. Stops at the end.
    pub fn advance(&mut self, dt: f64) {
        if !self.state.is_playing || !dt.is_finite() {
            return;
        }
        let next = self.state.current_time + dt.max(0.0);
        if next >= self.state.duration {
            self.state.current_time = self.state.duration;
            self.state.is_playing = false;
        } else {
            self.state.current_time = next;
        }
    }
}

impl Transport for ManualTransport {
    fn load_audio(&mut self, audio: Arc<DecodedAudio>) {
        self.state.is_playing = false;
        self.state.current_time = 0.0;
        self.set_duration(audio.duration_s());
    }

    fn play(&mut self) {
        if self.state.current_time < self.state.duration {
            self.state.is_playing = true;
        }
    }

    fn pause(&mut self) {
        self.state.is_playing = false;
    }

    fn seek(&mut self, time: f64) {
        if time.is_finite() {
            self.state.current_time = time.clamp(0.0, self.state.duration);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.volume = volume.clamp(0.0, 1.0);
    }

    fn state(&self) -> PlaybackState {
        self.state
    }
}

//! One open track: loader, transport, notes and the waveform view wired
//! together for a host UI.
//!
//! The host drives the session by calling [`Session::tick`] once per frame,
//! forwarding pointer events, and pushing note snapshots whenever the store
//! changes. Everything the host needs to draw comes back as values.

use std::time::Duration;

use serde::Serialize;

use crate::audio::transport::Transport;
use crate::config::Settings;
use crate::error::{DecodeError, NoteStoreError, RenderTargetUnavailable};
use crate::notes::engine::{ActivationFrame, NoteActivationEngine};
use crate::notes::store::NoteStore;
use crate::notes::types::{Note, NoteId, NotePatch};
use crate::types::{PlaybackState, TrackId};
use crate::waveform::interaction::{InteractionRequest, PointerEvent, WaveformInteraction};
use crate::waveform::loader::{LoadOutcome, LoadedTrack, TrackSource, WaveformLoader};
use crate::waveform::peaks::PeakSeries;
use crate::waveform::render::{render, DrawList, RenderInput, Viewport};

/// Message shown in place of a waveform that failed to load.
pub const UNAVAILABLE_MESSAGE: &str = "could not analyze audio";

/// What the waveform area should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum WaveformStatus {
    Empty,
    Loading(String),
    Ready,
    /// The last load failed. A previously loaded track stays visible.
    Unavailable(String),
}

/// Result of one [`Session::tick`].
#[derive(Debug, Clone, Default)]
pub struct SessionFrame {
    pub activation: ActivationFrame,
    /// A load finished this tick.
    pub loaded: Option<TrackId>,
    /// A load failed this tick.
    pub failed: Option<DecodeError>,
}

/// Read-only view of a session, for debugging.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDiagnostics {
    pub status: WaveformStatus,
    pub track_id: Option<TrackId>,
    pub track_name: Option<String>,
    pub peak_count: usize,
    pub note_count: usize,
    pub selected: Option<NoteId>,
    pub hover_time: Option<f64>,
    pub load_generation: u64,
    pub playback: PlaybackState,
    pub disposed: bool,
}

pub struct Session<T: Transport> {
    settings: Settings,
    transport: T,
    loader: WaveformLoader,
    track: Option<LoadedTrack>,
    status: WaveformStatus,
    notes: Vec<Note>,
    interaction: WaveformInteraction,
    activation: NoteActivationEngine,
    disposed: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, settings: Settings) -> Self {
        let loader = WaveformLoader::new(settings.peak_count, settings.cache());
        let interaction = WaveformInteraction::new(settings.hit_tolerance_px);
        let activation = NoteActivationEngine::new(
            settings.activation_tolerance_s,
            settings.exact_match_epsilon_s,
        );
        Self {
            settings,
            transport,
            loader,
            track: None,
            status: WaveformStatus::Empty,
            notes: Vec::new(),
            interaction,
            activation,
            disposed: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn playback(&self) -> PlaybackState {
        self.transport.state()
    }

    pub fn status(&self) -> &WaveformStatus {
        &self.status
    }

    pub fn track(&self) -> Option<&LoadedTrack> {
        self.track.as_ref()
    }

    pub fn track_id(&self) -> Option<TrackId> {
        self.track.as_ref().map(|t| t.id)
    }

    /// Notes of the current track, ordered by timestamp.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn selected(&self) -> Option<NoteId> {
        self.interaction.selected()
    }

    pub fn selected_note(&self) -> Option<&Note> {
        let id = self.interaction.selected()?;
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn hover_time(&self) -> Option<f64> {
        self.interaction.hover_time()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Change how far from the playhead notes stay active.
    pub fn set_activation_tolerance(&mut self, tolerance: f64) {
        if tolerance.is_finite() && tolerance >= 0.0 {
            self.settings.activation_tolerance_s = tolerance;
            self.activation.set_tolerance(tolerance);
        }
    }

    /// Start loading a track in the background. Supersedes any pending load.
    pub fn load(&mut self, source: TrackSource) -> u64 {
        if self.disposed {
            return self.loader.generation();
        }
        log::info!("Loading '{}'", source.name);
        self.status = WaveformStatus::Loading(source.name.clone());
        self.loader.request(source)
    }

    /// Block until the pending load resolves, for hosts without a frame loop.
    pub fn wait_for_load(&mut self, timeout: Duration) -> SessionFrame {
        let mut frame = SessionFrame::default();
        if self.disposed {
            return frame;
        }
        if let Some(outcome) = self.loader.wait(timeout) {
            self.apply_outcome(outcome, &mut frame);
        }
        frame.activation = self.activation.update(&self.notes, &self.transport.state());
        frame
    }

    /// Advance one frame: pick up finished loads and recompute the active note.
    pub fn tick(&mut self) -> SessionFrame {
        let mut frame = SessionFrame::default();
        if self.disposed {
            return frame;
        }
        if let Some(outcome) = self.loader.poll() {
            self.apply_outcome(outcome, &mut frame);
        }
        frame.activation = self.activation.update(&self.notes, &self.transport.state());
        frame
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome, frame: &mut SessionFrame) {
        match outcome.result {
            Ok(track) => {
                log::info!(
                    "Loaded '{}': {:.2}s, {} peaks",
                    track.name,
                    track.duration_s(),
                    track.peaks.len()
                );
                self.transport.load_audio(track.audio.clone());
                self.notes.retain(|n| n.track_id == track.id);
                self.interaction.reset();
                frame.loaded = Some(track.id);
                self.track = Some(track);
                self.status = WaveformStatus::Ready;
            }
            Err(e) => {
                log::warn!("Waveform unavailable for track {}: {}", outcome.track_id, e);
                frame.failed = Some(e);
                self.status = WaveformStatus::Unavailable(UNAVAILABLE_MESSAGE.to_string());
            }
        }
    }

    /// Replace the note snapshot.
    ///
    /// Notes for other tracks are ignored once a track is loaded.
    pub fn set_notes(&mut self, mut notes: Vec<Note>) {
        if let Some(id) = self.track_id() {
            notes.retain(|n| n.track_id == id);
        }
        notes.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.interaction.retain_selection(&notes);
        self.notes = notes;
    }

    /// Re-read the current track's notes from a store.
    pub fn refresh_notes(&mut self, store: &dyn NoteStore) {
        match self.track_id() {
            Some(id) => self.set_notes(store.list(id)),
            None => self.set_notes(Vec::new()),
        }
    }

    /// Forward a pointer event on a waveform `width` logical pixels wide.
    ///
    /// Seeks are carried out on the transport here. Note creation needs
    /// content from the user, so it is returned for the host to complete
    /// through [`Session::create_note`].
    pub fn handle_pointer(&mut self, event: PointerEvent, width: f64) -> Option<InteractionRequest> {
        if self.disposed || self.track.is_none() {
            return None;
        }
        let duration = self.transport.state().duration;
        let request = self.interaction.handle(event, &self.notes, width, duration)?;
        if let InteractionRequest::Seek(time) = request {
            self.transport.seek(time);
        }
        Some(request)
    }

    pub fn select(&mut self, id: Option<NoteId>) {
        self.interaction.select(id);
    }

    /// Add a note to the current track and refresh the snapshot.
    pub fn create_note(
        &mut self,
        store: &mut dyn NoteStore,
        timestamp: f64,
        content: &str,
        color: Option<String>,
    ) -> Result<Note, NoteStoreError> {
        let track_id = self.track_id().ok_or(NoteStoreError::NoTrackLoaded)?;
        let note = store.create(track_id, timestamp, content, color)?;
        self.refresh_notes(store);
        Ok(note)
    }

    pub fn update_note(
        &mut self,
        store: &mut dyn NoteStore,
        id: NoteId,
        patch: NotePatch,
    ) -> Result<(), NoteStoreError> {
        store.update(id, patch)?;
        self.refresh_notes(store);
        Ok(())
    }

    pub fn delete_note(&mut self, store: &mut dyn NoteStore, id: NoteId) -> Result<(), NoteStoreError> {
        store.delete(id)?;
        self.refresh_notes(store);
        Ok(())
    }

    /// Draw commands for the current frame.
    ///
    /// With no track loaded the list holds only the progress line at x = 0.
    pub fn render(&self, viewport: &Viewport) -> Result<DrawList, RenderTargetUnavailable> {
        if self.disposed {
            return Err(RenderTargetUnavailable);
        }
        let empty = PeakSeries::default();
        let (peaks, notes) = match &self.track {
            Some(t) => (t.peaks.as_ref(), self.notes.as_slice()),
            None => (&empty, &[][..]),
        };
        let playback = self.transport.state();
        let input = RenderInput {
            peaks,
            playback: &playback,
            notes,
            selected: self.interaction.selected(),
            hover_time: self.interaction.hover_time(),
        };
        Ok(render(&input, viewport, &self.settings.palette))
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        SessionDiagnostics {
            status: self.status.clone(),
            track_id: self.track_id(),
            track_name: self.track.as_ref().map(|t| t.name.clone()),
            peak_count: self.track.as_ref().map(|t| t.peaks.len()).unwrap_or(0),
            note_count: self.notes.len(),
            selected: self.interaction.selected(),
            hover_time: self.interaction.hover_time(),
            load_generation: self.loader.generation(),
            playback: self.transport.state(),
            disposed: self.disposed,
        }
    }

    /// Tear down: stop playback, drop pending loads, stop reacting.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.loader.cancel();
        self.activation.dispose();
        self.transport.pause();
        log::debug!("Session disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fixtures::sine_wav;
    use crate::audio::transport::ManualTransport;
    use crate::notes::engine::ActivationEvent;
    use crate::notes::store::InMemoryNoteStore;
    use crate::waveform::render::DrawCommand;

    const WAIT: Duration = Duration::from_secs(10);

    fn settings() -> Settings {
        Settings {
            peak_count: 64,
            cache_enabled: false,
            ..Default::default()
        }
    }

    fn loaded_session(seconds: f64, sample_rate: u32) -> Session<ManualTransport> {
        let mut session = Session::new(ManualTransport::default(), settings());
        session.load(TrackSource::from_bytes(
            "tone.wav",
            sine_wav(seconds, sample_rate),
            Some("wav"),
        ));
        let frame = session.wait_for_load(WAIT);
        assert!(frame.loaded.is_some());
        session
    }

    #[test]
    fn test_load_makes_waveform_ready() {
        let mut session = Session::new(ManualTransport::default(), settings());
        assert_eq!(session.status(), &WaveformStatus::Empty);
        session.load(TrackSource::from_bytes("tone.wav", sine_wav(1.0, 8000), Some("wav")));
        assert_eq!(session.status(), &WaveformStatus::Loading("tone.wav".into()));

        session.wait_for_load(WAIT);
        assert_eq!(session.status(), &WaveformStatus::Ready);
        assert_eq!(session.track().unwrap().peaks.len(), 64);
        assert!((session.playback().duration - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_failure_keeps_previous_waveform() {
        let mut session = loaded_session(1.0, 8000);
        let before = session.track().unwrap().id;

        session.load(TrackSource::from_bytes("junk.bin", b"no audio here".repeat(40), None));
        let frame = session.wait_for_load(WAIT);
        assert!(frame.failed.is_some());
        assert_eq!(
            session.status(),
            &WaveformStatus::Unavailable(UNAVAILABLE_MESSAGE.into())
        );
        assert_eq!(session.track().unwrap().id, before);
    }

    #[test]
    fn test_decode_failure_without_track() {
        let mut session = Session::new(ManualTransport::default(), settings());
        session.load(TrackSource::from_bytes("empty.wav", Vec::new(), Some("wav")));
        let frame = session.wait_for_load(WAIT);
        assert_eq!(frame.failed, Some(DecodeError::Empty));
        assert!(session.track().is_none());
        let list = session.render(&Viewport::new(100.0, 50.0, 1.0)).unwrap();
        assert!(!list
            .commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Rect { .. })));
    }

    #[test]
    fn test_double_click_requests_note_at_time() {
        // 256s track on a 512px surface: x=85 maps to exactly 42.5s.
        let mut session = loaded_session(256.0, 1000);
        let request = session.handle_pointer(PointerEvent::DoubleClick { x: 85.0 }, 512.0);
        assert_eq!(request, Some(InteractionRequest::CreateNote { timestamp: 42.5 }));

        let mut store = InMemoryNoteStore::new();
        let note = session.create_note(&mut store, 42.5, "chorus", None).unwrap();
        assert_eq!(note.timestamp, 42.5);
        assert_eq!(session.notes().len(), 1);
        // Creation does not move the playhead.
        assert_eq!(session.playback().current_time, 0.0);
    }

    #[test]
    fn test_click_seeks_transport() {
        let mut session = loaded_session(256.0, 1000);
        let request = session.handle_pointer(PointerEvent::Click { x: 256.0 }, 512.0);
        assert_eq!(request, Some(InteractionRequest::Seek(128.0)));
        assert_eq!(session.playback().current_time, 128.0);
    }

    #[test]
    fn test_click_on_marker_selects_without_seek() {
        let mut session = loaded_session(256.0, 1000);
        let mut store = InMemoryNoteStore::new();
        let note = session.create_note(&mut store, 64.0, "bridge", None).unwrap();

        // 64s on 512px over 256s is x=128.
        let request = session.handle_pointer(PointerEvent::Click { x: 131.0 }, 512.0);
        assert_eq!(request, Some(InteractionRequest::SelectionChanged(Some(note.id))));
        assert_eq!(session.selected_note().map(|n| n.id), Some(note.id));
        assert_eq!(session.playback().current_time, 0.0);

        session.delete_note(&mut store, note.id).unwrap();
        assert!(session.selected().is_none());
    }

    #[test]
    fn test_new_track_clears_hover_guide() {
        let mut session = loaded_session(256.0, 1000);
        session.handle_pointer(PointerEvent::Move { x: 256.0 }, 512.0);
        assert_eq!(session.hover_time(), Some(128.0));

        session.load(TrackSource::from_bytes("next.wav", sine_wav(2.0, 1000), Some("wav")));
        assert!(session.wait_for_load(WAIT).loaded.is_some());
        assert_eq!(session.hover_time(), None);
    }

    #[test]
    fn test_pointer_ignored_without_track() {
        let mut session = Session::new(ManualTransport::default(), settings());
        assert!(session
            .handle_pointer(PointerEvent::Click { x: 10.0 }, 100.0)
            .is_none());
        let mut store = InMemoryNoteStore::new();
        assert_eq!(
            session.create_note(&mut store, 1.0, "x", None),
            Err(NoteStoreError::NoTrackLoaded)
        );
    }

    #[test]
    fn test_tick_surfaces_notes_during_playback() {
        let mut session = loaded_session(30.0, 1000);
        let mut store = InMemoryNoteStore::new();
        let near = session.create_note(&mut store, 10.0, "near", None).unwrap();
        session.create_note(&mut store, 12.0, "also near", None).unwrap();
        session.create_note(&mut store, 25.0, "far", None).unwrap();

        session.transport_mut().seek(11.0);
        assert!(session.tick().activation.card.is_none());

        session.transport_mut().play();
        let frame = session.tick();
        let card = frame.activation.card.unwrap();
        // Equal distance: earlier timestamp wins.
        assert_eq!(card.note.id, near.id);
        assert_eq!(card.more_count, 1);
        assert_eq!(frame.activation.event, Some(ActivationEvent::Appeared(near.id)));

        // Same primary on the next tick: no new event.
        session.transport_mut().seek(10.8);
        assert!(session.tick().activation.event.is_none());
    }

    #[test]
    fn test_set_notes_filters_other_tracks() {
        let mut session = loaded_session(5.0, 1000);
        let id = session.track_id().unwrap();
        session.set_notes(vec![
            Note::new(id, 3.0, "b"),
            Note::new(TrackId::new(), 1.0, "other"),
            Note::new(id, 1.0, "a"),
        ]);
        let times: Vec<f64> = session.notes().iter().map(|n| n.timestamp).collect();
        assert_eq!(times, vec![1.0, 3.0]);
    }

    #[test]
    fn test_render_includes_markers() {
        let mut session = loaded_session(10.0, 1000);
        let mut store = InMemoryNoteStore::new();
        session.create_note(&mut store, 5.0, "mid", None).unwrap();
        let list = session.render(&Viewport::new(200.0, 40.0, 2.0)).unwrap();
        assert_eq!((list.width, list.height), (400, 80));
        let circles = list
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
            .count();
        assert_eq!(circles, 1);
    }

    #[test]
    fn test_dispose() {
        let mut session = loaded_session(2.0, 1000);
        session.transport_mut().play();
        session.dispose();
        assert!(session.is_disposed());
        assert!(!session.playback().is_playing);
        assert_eq!(
            session.render(&Viewport::new(100.0, 50.0, 1.0)),
            Err(RenderTargetUnavailable)
        );
        let frame = session.tick();
        assert!(frame.activation.card.is_none());
        assert!(session.diagnostics().disposed);
    }
}

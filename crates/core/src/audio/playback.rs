//! Non-blocking rodio playback engine implementing [`Transport`].

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rodio::{buffer::SamplesBuffer, OutputStream, OutputStreamHandle, Sink};

use super::decode::DecodedAudio;
use super::transport::Transport;
use crate::types::PlaybackState;

/// Command sent to the playback thread.
pub enum PlaybackCommand {
    /// Replace the loaded track and rewind.
    Load(Arc<DecodedAudio>),
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    /// Stop playback and rewind.
    Stop,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Playback state shared between the audio thread and its owner.
#[derive(Clone, Default)]
pub struct SharedPlayback {
    state: Arc<Mutex<PlaybackState>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl SharedPlayback {
    pub fn snapshot(&self) -> PlaybackState {
        *lock(&self.state)
    }

    fn update(&self, f: impl FnOnce(&mut PlaybackState)) {
        f(&mut lock(&self.state));
    }

    /// Store an error message from the playback thread.
    pub fn set_error(&self, msg: String) {
        *lock(&self.last_error) = Some(msg);
    }

    /// Take the last error, clearing it.
    pub fn take_error(&self) -> Option<String> {
        lock(&self.last_error).take()
    }
}

/// Audio output on a dedicated thread.
///
/// Commands go in through a channel; position and play state are published
/// to [`SharedPlayback`] every 10ms.
pub struct PlaybackEngine {
    command_tx: mpsc::Sender<PlaybackCommand>,
    pub shared: SharedPlayback,
}

impl PlaybackEngine {
    /// Spawn the playback thread.
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let shared = SharedPlayback::default();

        let thread_shared = shared.clone();
        std::thread::Builder::new()
            .name("playback-engine".into())
            .spawn(move || playback_thread(rx, thread_shared))
            .context("Failed to spawn playback thread")?;

        Ok(Self {
            command_tx: tx,
            shared,
        })
    }

    fn send(&self, cmd: PlaybackCommand) {
        if self.command_tx.send(cmd).is_err() {
            log::error!("Playback thread is not running (channel closed)");
            self.shared
                .set_error("Playback thread stopped unexpectedly".into());
        }
    }

    pub fn stop(&self) {
        self.send(PlaybackCommand::Stop);
    }

    pub fn take_error(&self) -> Option<String> {
        self.shared.take_error()
    }
}

impl Transport for PlaybackEngine {
    fn load_audio(&mut self, audio: Arc<DecodedAudio>) {
        let duration = audio.duration_s();
        self.shared.update(|s| {
            s.duration = duration;
            s.current_time = 0.0;
            s.is_playing = false;
        });
        self.send(PlaybackCommand::Load(audio));
    }

    fn play(&mut self) {
        self.send(PlaybackCommand::Play);
    }

    fn pause(&mut self) {
        self.send(PlaybackCommand::Pause);
    }

    fn seek(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        // Publish the target right away so the UI does not jump back for a tick.
        self.shared
            .update(|s| s.current_time = time.clamp(0.0, s.duration.max(0.0)));
        self.send(PlaybackCommand::Seek(time));
    }

    fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.shared.update(|s| s.volume = volume);
        self.send(PlaybackCommand::SetVolume(volume));
    }

    fn state(&self) -> PlaybackState {
        self.shared.snapshot()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkPhase {
    /// No sink, or it has drained.
    Idle,
    Playing,
    Paused,
}

fn sink_phase(sink: Option<&Sink>) -> SinkPhase {
    match sink {
        Some(s) if !s.empty() => {
            if s.is_paused() {
                SinkPhase::Paused
            } else {
                SinkPhase::Playing
            }
        }
        _ => SinkPhase::Idle,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlayStep {
    AlreadyPlaying,
    Resume,
    StartFrom(f64),
}

/// Decide how to honor a play command. Playing is idempotent; a finished
/// track restarts from the top.
fn plan_play(phase: SinkPhase, cursor_s: f64, duration: f64) -> PlayStep {
    match phase {
        SinkPhase::Playing => PlayStep::AlreadyPlaying,
        SinkPhase::Paused => PlayStep::Resume,
        SinkPhase::Idle if cursor_s >= duration => PlayStep::StartFrom(0.0),
        SinkPhase::Idle => PlayStep::StartFrom(cursor_s),
    }
}

/// State owned by the playback thread.
struct Player<'a> {
    handle: Option<&'a OutputStreamHandle>,
    shared: SharedPlayback,
    audio: Option<Arc<DecodedAudio>>,
    // Sink is recreated on every start because Sink::stop() permanently
    // kills the sink.
    sink: Option<Sink>,
    /// (wall clock at start, cursor at start)
    play_start: Option<(Instant, f64)>,
    cursor_s: f64,
    volume: f32,
}

impl Player<'_> {
    fn duration(&self) -> f64 {
        self.audio.as_ref().map(|a| a.duration_s()).unwrap_or(0.0)
    }

    fn current_cursor(&self) -> f64 {
        match (self.play_start, &self.sink) {
            (Some((start, cursor)), Some(s)) if !s.is_paused() => {
                (cursor + start.elapsed().as_secs_f64()).min(self.duration())
            }
            _ => self.cursor_s,
        }
    }

    fn start_from(&mut self, cursor_s: f64) {
        let Some(audio) = self.audio.clone() else {
            log::warn!("Play requested with no track loaded");
            return;
        };
        let Some(handle) = self.handle else {
            self.shared
                .set_error("No audio output device available".into());
            return;
        };

        drop(self.sink.take());
        let start_frame = (cursor_s * audio.sample_rate as f64) as usize;
        let samples = audio.interleaved_from(start_frame);
        if samples.is_empty() {
            log::debug!("Play requested at end of track");
            return;
        }

        match Sink::try_new(handle) {
            Ok(sink) => {
                let source =
                    SamplesBuffer::new(audio.channel_count() as u16, audio.sample_rate, samples);
                sink.set_volume(self.volume);
                sink.append(source);
                sink.play();
                self.sink = Some(sink);
                self.play_start = Some((Instant::now(), cursor_s));
                self.cursor_s = cursor_s;
                self.shared.update(|s| s.is_playing = true);
                log::debug!("Playing from {:.3}s", cursor_s);
            }
            Err(e) => {
                log::error!("Failed to create audio sink: {}", e);
                self.shared.set_error(format!("Audio sink: {}", e));
            }
        }
    }

    fn process(&mut self, cmd: PlaybackCommand) {
        match cmd {
            PlaybackCommand::Load(audio) => {
                drop(self.sink.take());
                self.play_start = None;
                self.cursor_s = 0.0;
                self.audio = Some(audio);
                let duration = self.duration();
                self.shared.update(|s| {
                    s.duration = duration;
                    s.current_time = 0.0;
                    s.is_playing = false;
                });
            }
            PlaybackCommand::Play => {
                match plan_play(sink_phase(self.sink.as_ref()), self.cursor_s, self.duration()) {
                    PlayStep::AlreadyPlaying => {}
                    PlayStep::Resume => {
                        if let Some(s) = &self.sink {
                            s.play();
                        }
                        self.play_start = Some((Instant::now(), self.cursor_s));
                        self.shared.update(|s| s.is_playing = true);
                    }
                    PlayStep::StartFrom(from) => self.start_from(from),
                }
            }
            PlaybackCommand::Pause => {
                self.cursor_s = self.current_cursor();
                if let Some(s) = &self.sink {
                    s.pause();
                }
                self.play_start = None;
                self.shared.update(|s| {
                    s.is_playing = false;
                    s.current_time = self.cursor_s;
                });
            }
            PlaybackCommand::Seek(time) => {
                let target = time.clamp(0.0, self.duration());
                let was_playing = sink_phase(self.sink.as_ref()) == SinkPhase::Playing;
                self.cursor_s = target;
                if was_playing {
                    self.start_from(target);
                } else {
                    drop(self.sink.take());
                    self.play_start = None;
                }
                self.shared.update(|s| s.current_time = target);
            }
            PlaybackCommand::SetVolume(volume) => {
                self.volume = volume;
                if let Some(s) = &self.sink {
                    s.set_volume(volume);
                }
            }
            PlaybackCommand::Stop => {
                drop(self.sink.take());
                self.play_start = None;
                self.cursor_s = 0.0;
                self.shared.update(|s| {
                    s.is_playing = false;
                    s.current_time = 0.0;
                });
            }
        }
    }

    /// Publish the cursor and detect the end of the track.
    fn tick(&mut self) {
        let Some(sink) = &self.sink else { return };
        if self.play_start.is_none() {
            return;
        }
        if sink.empty() {
            self.play_start = None;
            self.cursor_s = self.duration();
            let end = self.cursor_s;
            self.shared.update(|s| {
                s.is_playing = false;
                s.current_time = end;
            });
        } else if !sink.is_paused() {
            let cursor = self.current_cursor();
            self.shared.update(|s| s.current_time = cursor);
        }
    }
}

fn playback_thread(rx: mpsc::Receiver<PlaybackCommand>, shared: SharedPlayback) {
    // OutputStream must stay alive for the entire thread lifetime. Without a
    // device the thread keeps consuming commands so seeks still land.
    let audio = match OutputStream::try_default() {
        Ok(pair) => {
            log::info!("Playback engine: audio device opened successfully");
            Some(pair)
        }
        Err(e) => {
            log::error!("Failed to open audio output: {}", e);
            shared.set_error(format!("Audio device: {}", e));
            None
        }
    };

    let mut player = Player {
        handle: audio.as_ref().map(|(_, h)| h),
        shared,
        audio: None,
        sink: None,
        play_start: None,
        cursor_s: 0.0,
        volume: 1.0,
    };

    loop {
        match rx.recv_timeout(Duration::from_millis(10)) {
            Ok(cmd) => {
                player.process(cmd);
                while let Ok(cmd) = rx.try_recv() {
                    player.process(cmd);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        player.tick();
    }
}

//! Background track analysis with stale-result rejection.
//!
//! Every request bumps a generation counter. Results carry the generation
//! they were started with, and `poll` discards anything older than the
//! latest request, so a slow decode of a replaced track never reaches the
//! display.

use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::cache::{bytes_hash, PeakCache};
use super::peaks::{compute_peaks, PeakSeries};
use crate::audio::decode::{decode, DecodedAudio};
use crate::error::DecodeError;
use crate::types::TrackId;

/// Raw audio for a track, not yet decoded.
#[derive(Debug, Clone)]
pub struct TrackSource {
    pub id: TrackId,
    pub name: String,
    pub bytes: Arc<[u8]>,
    /// Probe hint, e.g. "mp3".
    pub extension: Option<String>,
}

impl TrackSource {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, extension: Option<&str>) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            bytes: bytes.into(),
            extension: extension.map(str::to_lowercase),
        }
    }

    /// Read an audio file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read audio file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let ext = path.extension().and_then(|e| e.to_str());
        Ok(Self::from_bytes(name, bytes, ext))
    }

    /// Reuse an existing track identity, so stored notes stay attached.
    pub fn with_id(mut self, id: TrackId) -> Self {
        self.id = id;
        self
    }
}

/// A fully analyzed track.
#[derive(Debug, Clone)]
pub struct LoadedTrack {
    pub id: TrackId,
    pub name: String,
    pub peaks: Arc<PeakSeries>,
    pub audio: Arc<DecodedAudio>,
}

impl LoadedTrack {
    pub fn duration_s(&self) -> f64 {
        self.audio.duration_s()
    }
}

/// Decode a track and compute its normalized peaks.
///
/// Peaks come from the cache when an entry for these bytes exists.
pub fn analyze(
    source: &TrackSource,
    peak_count: usize,
    cache: Option<&PeakCache>,
) -> Result<LoadedTrack, DecodeError> {
    let audio = decode(&source.bytes, source.extension.as_deref())?;

    let hash = cache.map(|_| bytes_hash(&source.bytes));
    let cached = match (cache, &hash) {
        (Some(c), Some(h)) => c.get(h, peak_count).map(|hit| hit.peaks),
        _ => None,
    };

    let peaks = match cached {
        Some(p) => p,
        None => {
            let p = compute_peaks(audio.primary_channel(), peak_count);
            if let (Some(c), Some(h)) = (cache, &hash) {
                if let Err(e) = c.store(h, &p, audio.duration_s()) {
                    log::warn!("{:#}", e);
                }
            }
            p
        }
    };

    Ok(LoadedTrack {
        id: source.id,
        name: source.name.clone(),
        peaks: Arc::new(peaks),
        audio: Arc::new(audio),
    })
}

fn run_once<F: FnOnce()>(slot: &Mutex<Option<F>>) {
    let job = slot.lock().ok().and_then(|mut j| j.take());
    if let Some(job) = job {
        job();
    }
}

/// Result of one load request.
#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub track_id: TrackId,
    pub result: Result<LoadedTrack, DecodeError>,
}

/// Runs `analyze` off the calling thread, one worker per request.
pub struct WaveformLoader {
    generation: u64,
    in_flight: Option<TrackId>,
    tx: mpsc::Sender<LoadOutcome>,
    rx: mpsc::Receiver<LoadOutcome>,
    peak_count: usize,
    cache: Option<PeakCache>,
}

impl WaveformLoader {
    pub fn new(peak_count: usize, cache: Option<PeakCache>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            generation: 0,
            in_flight: None,
            tx,
            rx,
            peak_count,
            cache,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Track currently being analyzed, if any.
    pub fn in_flight(&self) -> Option<TrackId> {
        self.in_flight
    }

    /// Start analyzing a track. Any earlier request becomes stale.
    pub fn request(&mut self, source: TrackSource) -> u64 {
        let peak_count = self.peak_count;
        let cache = self.cache.clone();
        let track_id = source.id;
        let name = source.name.clone();
        self.dispatch(track_id, name, move || {
            analyze(&source, peak_count, cache.as_ref())
        })
    }

    fn dispatch<F>(&mut self, track_id: TrackId, name: String, work: F) -> u64
    where
        F: FnOnce() -> Result<LoadedTrack, DecodeError> + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        self.in_flight = Some(track_id);

        let tx = self.tx.clone();
        let job = move || {
            let started = Instant::now();
            // A decoder panic on a malformed stream still has to resolve the load.
            let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(work)) {
                Ok(result) => result,
                Err(_) => {
                    log::error!("Decoder panicked while analyzing '{}'", name);
                    Err(DecodeError::Corrupt("decoder panicked".into()))
                }
            };
            log::debug!(
                "Analysis of '{}' (generation {}) took {:?}",
                name,
                generation,
                started.elapsed()
            );
            // The loader may have been dropped; nothing to report to then.
            let _ = tx.send(LoadOutcome {
                generation,
                track_id,
                result,
            });
        };

        // Run inline if a worker cannot be spawned, so the request still resolves.
        let job = Arc::new(Mutex::new(Some(job)));
        let worker_job = Arc::clone(&job);
        let spawned = std::thread::Builder::new()
            .name(format!("waveform-load-{}", generation))
            .spawn(move || run_once(&worker_job));
        if let Err(e) = spawned {
            log::error!("Failed to spawn waveform worker, analyzing inline: {}", e);
            run_once(&job);
        }

        generation
    }

    /// Abandon the in-flight request; its result will be discarded.
    pub fn cancel(&mut self) {
        if self.in_flight.take().is_some() {
            self.generation += 1;
        }
    }

    fn accept(&mut self, outcome: LoadOutcome) -> Option<LoadOutcome> {
        if outcome.generation != self.generation {
            log::debug!(
                "Discarding stale waveform result (generation {}, current {})",
                outcome.generation,
                self.generation
            );
            return None;
        }
        self.in_flight = None;
        Some(outcome)
    }

    /// Non-blocking: the current request's outcome, if it has arrived.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let mut current = None;
        while let Ok(outcome) = self.rx.try_recv() {
            if let Some(accepted) = self.accept(outcome) {
                current = Some(accepted);
            }
        }
        current
    }

    /// Block until the current request resolves or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadOutcome> {
        let deadline = Instant::now() + timeout;
        while self.in_flight.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    if let Some(accepted) = self.accept(outcome) {
                        return Some(accepted);
                    }
                }
                Err(_) => return None,
            }
        }
        None
    }
}

//! Decode in-memory audio bytes into per-channel samples via symphonia.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;

/// PCM audio split into channels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedAudio {
    /// One sample vector per channel, all the same length.
    pub channels: Vec<Vec<f64>>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Length in seconds.
    pub fn duration_s(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples of the first channel, which drive the waveform.
    pub fn primary_channel(&self) -> &[f64] {
        self.channels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Interleaved f32 frames starting at `start_frame`, for playback.
    pub fn interleaved_from(&self, start_frame: usize) -> Vec<f32> {
        let frames = self.frames();
        let start = start_frame.min(frames);
        let n_ch = self.channel_count();
        let mut out = Vec::with_capacity((frames - start) * n_ch);
        for frame in start..frames {
            for ch in &self.channels {
                out.push(ch[frame] as f32);
            }
        }
        out
    }
}

/// Decode a complete audio file held in memory.
///
/// `extension` is a probe hint such as `"mp3"`. Fails without side effects
/// when the bytes are empty, not a known container/codec, or corrupt.
pub fn decode(bytes: &[u8], extension: Option<&str>) -> Result<DecodedAudio, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut n_channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let mut channels: Vec<Vec<f64>> = vec![Vec::new(); n_channels];

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Corrupt(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let frames = decoded.frames();
                if frames == 0 {
                    continue;
                }
                if channels.is_empty() {
                    n_channels = spec.channels.count();
                    channels = vec![Vec::new(); n_channels];
                }
                if sample_rate == 0 {
                    sample_rate = spec.rate;
                }

                let mut sample_buf = SampleBuffer::<f64>::new(frames as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                let interleaved = sample_buf.samples();

                for frame in interleaved.chunks_exact(n_channels.max(1)) {
                    for (ch, &s) in channels.iter_mut().zip(frame) {
                        ch.push(s);
                    }
                }
            }
            Err(SymphError::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(DecodeError::Corrupt(e.to_string())),
        }
    }

    if channels.iter().all(Vec::is_empty) {
        return Err(DecodeError::NoSamples);
    }

    log::info!(
        "Decoded {} frames, {} channel(s) at {} Hz",
        channels[0].len(),
        channels.len(),
        sample_rate
    );

    Ok(DecodedAudio {
        channels,
        sample_rate,
    })
}

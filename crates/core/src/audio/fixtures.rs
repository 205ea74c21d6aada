//! Synthesized audio for tests.

use std::io::Cursor;

/// Encode channels as a 16-bit PCM WAV file in memory.
pub fn wav_bytes(channels: &[Vec<f64>], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..channels[0].len() {
            for ch in channels {
                writer.write_sample((ch[i].clamp(-1.0, 1.0) * 32767.0) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Mono sine tone.
pub fn sine(freq: f64, amplitude: f64, sample_rate: u32, seconds: f64) -> Vec<f64> {
    let n = (sample_rate as f64 * seconds) as usize;
    (0..n)
        .map(|i| (i as f64 / sample_rate as f64 * freq * std::f64::consts::TAU).sin() * amplitude)
        .collect()
}

/// Mono sine tone as WAV bytes.
pub fn sine_wav(seconds: f64, sample_rate: u32) -> Vec<u8> {
    wav_bytes(&[sine(440.0, 0.5, sample_rate, seconds)], sample_rate)
}

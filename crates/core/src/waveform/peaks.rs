//! Downsampling decoded audio into a fixed-length peak series.

use serde::{Deserialize, Serialize};

/// Number of peaks computed per track unless configured otherwise.
pub const DEFAULT_PEAK_COUNT: usize = 1000;

/// Normalized amplitude magnitudes, one per downsampling block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakSeries {
    pub peaks: Vec<f32>,
}

impl PeakSeries {
    pub fn new(peaks: Vec<f32>) -> Self {
        Self { peaks }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Largest value in the series, 0 for an empty series.
    pub fn max(&self) -> f32 {
        self.peaks.iter().copied().fold(0.0, f32::max)
    }

    /// True when every peak is zero.
    pub fn is_silent(&self) -> bool {
        self.max() == 0.0
    }
}

/// Compute one peak per block of `samples`.
///
/// Block size is `samples.len() / sample_count`; samples past the last full
/// block are ignored. When the buffer is shorter than `sample_count` every
/// block is empty and its peak is 0.
pub fn extract_peaks(samples: &[f64], sample_count: usize) -> PeakSeries {
    if sample_count == 0 {
        return PeakSeries::default();
    }

    let block_size = samples.len() / sample_count;
    if block_size == 0 {
        if !samples.is_empty() {
            log::debug!(
                "Track has {} samples, fewer than {} peaks; waveform is flat",
                samples.len(),
                sample_count
            );
        }
        return PeakSeries::new(vec![0.0; sample_count]);
    }

    let peaks = samples
        .chunks_exact(block_size)
        .take(sample_count)
        .map(|block| block.iter().fold(0.0f64, |acc, &s| acc.max(s.abs())) as f32)
        .collect();

    PeakSeries::new(peaks)
}

/// Scale the series so its maximum becomes 1.0.
///
/// A silent series is returned unchanged.
pub fn normalize(series: PeakSeries) -> PeakSeries {
    let max = series.max();
    if max == 0.0 {
        log::debug!("Silent waveform, skipping normalization");
        return series;
    }
    PeakSeries::new(series.peaks.iter().map(|&p| p / max).collect())
}

/// Extract and normalize in one step.
pub fn compute_peaks(samples: &[f64], sample_count: usize) -> PeakSeries {
    normalize(extract_peaks(samples, sample_count))
}

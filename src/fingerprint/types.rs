use serde::Serialize;
use std::fmt;

use crate::error::{FingerprintError, Result};

/// Normalized mono samples at a fixed sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Scales 16-bit PCM into [-1, 1) by dividing by 2^15.
    pub fn from_pcm16(pcm: &[i16], sample_rate: u32) -> Self {
        let samples = pcm.iter().map(|&s| f32::from(s) / 32768.0).collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Time × frequency magnitudes. Every frame has the same number of bins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectrogramMatrix {
    frames: Vec<Vec<f32>>,
    bins: usize,
}

impl SpectrogramMatrix {
    /// Builds a matrix from caller-supplied frames, rejecting ragged input.
    pub fn new(frames: Vec<Vec<f32>>) -> Result<Self> {
        let bins = frames.first().map_or(0, Vec::len);
        if let Some((t, frame)) = frames.iter().enumerate().find(|(_, f)| f.len() != bins) {
            return Err(FingerprintError::invalid_input(format!(
                "frame {} has {} bins, expected {}",
                t,
                frame.len(),
                bins
            )));
        }
        Ok(Self { frames, bins })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn bins_per_frame(&self) -> usize {
        self.bins
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() || self.bins == 0
    }

    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    pub fn global_max(&self) -> f32 {
        self.frames
            .iter()
            .flat_map(|f| f.iter().copied())
            .fold(0.0f32, f32::max)
    }
}

/// A qualifying spectral peak.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub frame: usize,
    pub bin: usize,
    pub magnitude: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FramePeaks {
    frame: usize,
    bins: Vec<usize>,
}

/// Sparse frame → peak bins container, sorted by frame.
///
/// A frame is either absent or holds at least one bin; an empty bin set is
/// never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeakMap {
    entries: Vec<FramePeaks>,
}

impl PeakMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the peaks of `frame`. Empty sets are dropped; bins are sorted
    /// and deduplicated. Frames must be pushed in strictly ascending order.
    pub fn push(&mut self, frame: usize, mut bins: Vec<usize>) -> Result<()> {
        if let Some(last) = self.entries.last() {
            if frame <= last.frame {
                return Err(FingerprintError::invalid_input(format!(
                    "peak frame {} pushed after frame {}",
                    frame, last.frame
                )));
            }
        }
        if bins.is_empty() {
            return Ok(());
        }
        bins.sort_unstable();
        bins.dedup();
        self.entries.push(FramePeaks { frame, bins });
        Ok(())
    }

    /// Present frames in ascending order with their bins.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        self.entries.iter().map(|e| (e.frame, e.bins.as_slice()))
    }

    /// Present frames `t` with `after < t <= until`, ascending.
    pub fn range(&self, after: usize, until: usize) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        let start = self.entries.partition_point(|e| e.frame <= after);
        self.entries[start..]
            .iter()
            .take_while(move |e| e.frame <= until)
            .map(|e| (e.frame, e.bins.as_slice()))
    }

    /// Number of frames holding peaks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn peak_count(&self) -> usize {
        self.entries.iter().map(|e| e.bins.len()).sum()
    }
}

/// Landmark hash plus the anchor frame it was taken from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint {
    pub hash: String,
    pub timestamp: usize,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.hash, self.timestamp)
    }
}

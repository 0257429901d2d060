//! Landmark fingerprint pipeline.
//!
//! Waveform -> spectrogram -> peak map -> fingerprints. Each stage is a pure
//! function of its input and an [`AnalysisConfig`].

pub mod hashing;
pub mod peaks;
pub mod spectrogram;
pub mod types;

pub use spectrogram::compute_spectrogram;
pub use types::{Fingerprint, SpectrogramMatrix, Waveform};

use crate::config::AnalysisConfig;
use hashing::extract_fingerprints;
use crate::error::Result;

/// Run the whole pipeline on a decoded waveform.
pub fn fingerprint_waveform(waveform: &Waveform, cfg: &AnalysisConfig) -> Result<Vec<Fingerprint>> {
    cfg.validate()?;

    log::info!(
        "Fingerprinting {} samples ({:.1}s at {}Hz)",
        waveform.len(),
        waveform.duration_secs(),
        waveform.sample_rate()
    );

    let matrix = compute_spectrogram(waveform, cfg)?;
    extract_fingerprints(&matrix, cfg)
}

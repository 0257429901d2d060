use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use super::types::{SpectrogramMatrix, Waveform};
use crate::config::AnalysisConfig;
use crate::error::Result;

/// Short-time magnitude spectrum of `waveform`.
///
/// Frame `i` covers samples `[i*H, i*H + W)`, Hann-weighted, and keeps the
/// first `W/2` magnitudes of a forward FFT. The transform is rustfft's
/// unnormalized complex FFT in `f32` (any size, no 1/N scaling); peak
/// thresholds downstream are relative, so only the fixed convention matters.
///
/// A waveform shorter than one window yields an empty matrix.
pub fn compute_spectrogram(waveform: &Waveform, cfg: &AnalysisConfig) -> Result<SpectrogramMatrix> {
    cfg.validate()?;

    let samples = waveform.samples();
    let window_size = cfg.window_size;
    let hop_size = cfg.hop_size;
    let bins = cfg.bins_per_frame();
    let num_frames = frame_count(samples.len(), window_size, hop_size);

    if num_frames == 0 {
        log::debug!(
            "Waveform of {} samples is shorter than a {}-sample window, no frames",
            samples.len(),
            window_size
        );
        return SpectrogramMatrix::new(Vec::new());
    }

    let hann = hann_window(window_size);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_size);

    let frames: Vec<Vec<f32>> = (0..num_frames)
        .into_par_iter()
        .map(|i| {
            let start = i * hop_size;
            let mut buffer: Vec<Complex<f32>> = samples[start..start + window_size]
                .iter()
                .zip(hann.iter())
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();
            fft.process(&mut buffer);

            buffer[..bins]
                .iter()
                .map(|c| (c.re * c.re + c.im * c.im).sqrt())
                .collect()
        })
        .collect();

    log::debug!(
        "Spectrogram: {} frames x {} bins (W={}, H={}, {:.2} Hz per bin)",
        frames.len(),
        bins,
        window_size,
        hop_size,
        bin_to_hz(1, window_size, waveform.sample_rate())
    );

    SpectrogramMatrix::new(frames)
}

/// `floor((n - window) / hop)`, or 0 when `n < window`.
pub fn frame_count(n: usize, window_size: usize, hop_size: usize) -> usize {
    if n < window_size || hop_size == 0 {
        return 0;
    }
    (n - window_size) / hop_size
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

/// Frequency in Hz at the centre of `bin`.
pub fn bin_to_hz(bin: usize, window_size: usize, sample_rate: u32) -> f32 {
    bin as f32 * sample_rate as f32 / window_size as f32
}

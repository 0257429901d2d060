use super::types::{Peak, PeakMap, SpectrogramMatrix};
use crate::config::AnalysisConfig;

/// Per-frame local maxima above `ratio * frame max`.
///
/// Frames without a qualifying bin are left out of the map.
pub fn detect_peaks(matrix: &SpectrogramMatrix, cfg: &AnalysisConfig) -> PeakMap {
    let mut peaks = PeakMap::new();
    let mut strongest: Option<Peak> = None;

    for (t, frame) in matrix.frames().iter().enumerate() {
        let found = frame_peaks(t, frame, cfg);
        for peak in &found {
            if strongest.map_or(true, |s| peak.magnitude > s.magnitude) {
                strongest = Some(*peak);
            }
        }

        let bins: Vec<usize> = found.iter().map(|p| p.bin).collect();
        // frames are visited in ascending order
        let pushed = peaks.push(t, bins);
        debug_assert!(pushed.is_ok(), "frame {} pushed out of order", t);
    }

    log::debug!(
        "Peaks: {} in {} of {} frames",
        peaks.peak_count(),
        peaks.len(),
        matrix.frame_count()
    );
    if let Some(p) = strongest {
        log::debug!("Strongest peak: frame {} bin {} ({:.3})", p.frame, p.bin, p.magnitude);
    }
    peaks
}

/// Qualifying peaks of one frame, ascending by bin.
pub fn frame_peaks(t: usize, frame: &[f32], cfg: &AnalysisConfig) -> Vec<Peak> {
    let threshold = cfg.peak_threshold_ratio * max_in_frame(frame);

    frame
        .iter()
        .enumerate()
        .filter(|&(f, &magnitude)| magnitude > threshold && is_local_peak(frame, f))
        .map(|(f, &magnitude)| Peak { frame: t, bin: f, magnitude })
        .collect()
}

/// Strictly greater than each neighbour that exists.
fn is_local_peak(frame: &[f32], index: usize) -> bool {
    let value = frame[index];
    let above_left = index == 0 || value > frame[index - 1];
    let above_right = index + 1 >= frame.len() || value > frame[index + 1];
    above_left && above_right
}

fn max_in_frame(frame: &[f32]) -> f32 {
    frame.iter().copied().fold(0.0f32, f32::max)
}

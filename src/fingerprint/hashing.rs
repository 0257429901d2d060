use rayon::prelude::*;
use sha1::{Digest, Sha1};

use super::peaks::detect_peaks;
use super::types::{Fingerprint, PeakMap, SpectrogramMatrix};
use crate::config::AnalysisConfig;
use crate::error::{FingerprintError, Result};

/// Detects peaks in `matrix` and pairs them into landmark fingerprints.
///
/// A matrix with no frames or no bins is `InvalidInput`; a matrix that is
/// present but has no peaks (silence) yields an empty sequence.
pub fn extract_fingerprints(matrix: &SpectrogramMatrix, cfg: &AnalysisConfig) -> Result<Vec<Fingerprint>> {
    if matrix.is_empty() {
        return Err(FingerprintError::invalid_input(format!(
            "empty spectrogram ({} frames x {} bins)",
            matrix.frame_count(),
            matrix.bins_per_frame()
        )));
    }
    cfg.validate()?;

    let peaks = detect_peaks(matrix, cfg);
    if peaks.is_empty() {
        log::debug!("No peaks above threshold, nothing to pair");
    }
    let fingerprints = hash_landmarks(&peaks, cfg);

    log::info!("Fingerprint extraction completed: {} fingerprints", fingerprints.len());
    Ok(fingerprints)
}

/// Pairs every anchor peak with the target peaks of the following
/// `anchor_distance` frames that lie within `frequency_distance` bins.
///
/// Output is ordered by anchor frame, anchor bin, target frame, target bin.
/// Anchor frames are hashed in parallel and concatenated in frame order.
pub fn hash_landmarks(peaks: &PeakMap, cfg: &AnalysisConfig) -> Vec<Fingerprint> {
    let anchors: Vec<(usize, &[usize])> = peaks.iter().collect();

    let per_anchor: Vec<Vec<Fingerprint>> = anchors
        .par_iter()
        .map(|&(t, anchor_bins)| {
            let mut out = Vec::new();
            for &anchor in anchor_bins {
                for (target_t, target_bins) in peaks.range(t, t.saturating_add(cfg.anchor_distance)) {
                    for &target in target_bins {
                        if anchor.abs_diff(target) <= cfg.frequency_distance {
                            out.push(Fingerprint {
                                hash: landmark_hash(anchor, target, target_t - t),
                                timestamp: t,
                            });
                        }
                    }
                }
            }
            out
        })
        .collect();

    per_anchor.concat()
}

/// Lowercase hex SHA-1 of `"{anchor}|{target}|{delta}"`.
pub fn landmark_hash(anchor_bin: usize, target_bin: usize, delta_frames: usize) -> String {
    let data = format!("{}|{}|{}", anchor_bin, target_bin, delta_frames);
    hex::encode(Sha1::digest(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn peak_map(entries: Vec<(usize, Vec<usize>)>) -> PeakMap {
        let mut map = PeakMap::new();
        for (t, bins) in entries {
            map.push(t, bins).unwrap();
        }
        map
    }

    /// Every (anchor, target, delta) triple that could have produced `hash`.
    fn triple_index(max_bin: usize, max_delta: usize) -> HashMap<String, (usize, usize, usize)> {
        let mut index = HashMap::new();
        for a in 0..=max_bin {
            for p in 0..=max_bin {
                for dt in 1..=max_delta {
                    index.insert(landmark_hash(a, p, dt), (a, p, dt));
                }
            }
        }
        index
    }

    #[test]
    fn hash_is_deterministic_hex_sha1() {
        let h = landmark_hash(23, 25, 3);
        assert_eq!(h, landmark_hash(23, 25, 3));
        assert_eq!(h.len(), 40);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        // SHA-1("1|2|3")
        assert_eq!(landmark_hash(1, 2, 3), hex::encode(Sha1::digest(b"1|2|3")));
    }

    #[test]
    fn delimiter_keeps_tuples_apart() {
        assert_ne!(landmark_hash(1, 23, 4), landmark_hash(12, 3, 4));
        assert_ne!(landmark_hash(1, 2, 34), landmark_hash(1, 23, 4));
    }

    #[test]
    fn no_collisions_over_ten_thousand_triples() {
        let mut seen = HashSet::new();
        for a in 0..20 {
            for p in 0..100 {
                for dt in 1..=5 {
                    assert!(seen.insert(landmark_hash(a, p, dt)));
                }
            }
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn pairs_respect_time_and_frequency_bounds() {
        let cfg = AnalysisConfig::default();
        let peaks = peak_map(vec![
            (0, vec![10, 40]),
            (1, vec![12]),
            (3, vec![21, 50]),
            (5, vec![9]),
            (6, vec![10]),
        ]);
        let fps = hash_landmarks(&peaks, &cfg);
        let index = triple_index(60, 10);

        let decoded: Vec<(usize, (usize, usize, usize))> =
            fps.iter().map(|fp| (fp.timestamp, index[&fp.hash])).collect();

        for &(_, (a, p, dt)) in &decoded {
            assert!(dt >= 1 && dt <= 5);
            assert!(a.abs_diff(p) <= 10);
        }

        // frame 6 is six frames after frame 0, and 21 is eleven bins from 10
        assert_eq!(
            decoded,
            vec![
                (0, (10, 12, 1)),
                (0, (10, 9, 5)),
                (0, (40, 50, 3)),
                (1, (12, 21, 2)),
                (1, (12, 9, 4)),
                (1, (12, 10, 5)),
                (5, (9, 10, 1)),
            ]
        );
    }

    #[test]
    fn output_is_in_canonical_order() {
        let cfg = AnalysisConfig::default();
        let peaks = peak_map(vec![(0, vec![5, 7]), (1, vec![6, 8]), (2, vec![5])]);
        let fps = hash_landmarks(&peaks, &cfg);
        let expected: Vec<Fingerprint> = [
            (0, 5, 6, 1),
            (0, 5, 8, 1),
            (0, 5, 5, 2),
            (0, 7, 6, 1),
            (0, 7, 8, 1),
            (0, 7, 5, 2),
            (1, 6, 5, 1),
            (1, 8, 5, 1),
        ]
        .iter()
        .map(|&(t, a, p, dt)| Fingerprint { hash: landmark_hash(a, p, dt), timestamp: t })
        .collect();
        assert_eq!(fps, expected);
    }

    #[test]
    fn empty_peak_map_hashes_to_nothing() {
        assert!(hash_landmarks(&PeakMap::new(), &AnalysisConfig::default()).is_empty());
    }

    #[test]
    fn empty_matrix_is_invalid_input() {
        let cfg = AnalysisConfig::default();
        let err = extract_fingerprints(&SpectrogramMatrix::default(), &cfg).unwrap_err();
        assert!(matches!(err, FingerprintError::InvalidInput(_)));

        let no_bins = SpectrogramMatrix::new(vec![vec![], vec![]]).unwrap();
        assert!(matches!(
            extract_fingerprints(&no_bins, &cfg),
            Err(FingerprintError::InvalidInput(_))
        ));
    }

    #[test]
    fn silent_matrix_yields_empty_sequence() {
        let cfg = AnalysisConfig::default();
        let silent = SpectrogramMatrix::new(vec![vec![0.0; 512]; 8]).unwrap();
        assert!(extract_fingerprints(&silent, &cfg).unwrap().is_empty());
    }

    #[test]
    fn distances_come_from_config() {
        let peaks = peak_map(vec![(0, vec![10]), (2, vec![13])]);
        let tight = AnalysisConfig { anchor_distance: 1, ..Default::default() };
        let narrow = AnalysisConfig { frequency_distance: 2, ..Default::default() };
        assert!(hash_landmarks(&peaks, &tight).is_empty());
        assert!(hash_landmarks(&peaks, &narrow).is_empty());
        assert_eq!(hash_landmarks(&peaks, &AnalysisConfig::default()).len(), 1);
    }
}

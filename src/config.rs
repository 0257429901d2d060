use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{FingerprintError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[cfg(feature = "capture")]
    #[serde(default)]
    pub record: RecordConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Tunables shared by the spectrogram, peak and hashing stages.
///
/// Passed by reference into every stage; nothing in the pipeline reads
/// global constants, so several configurations can coexist in one process.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    /// Samples per transform window (W).
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Samples between consecutive window starts (H).
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
    /// A bin must exceed this fraction of its frame maximum to be a peak.
    #[serde(default = "default_peak_threshold_ratio")]
    pub peak_threshold_ratio: f32,
    /// Maximum frame distance between anchor and target peaks.
    #[serde(default = "default_anchor_distance")]
    pub anchor_distance: usize,
    /// Maximum bin distance between anchor and target peaks.
    #[serde(default = "default_frequency_distance")]
    pub frequency_distance: usize,
}

#[cfg(feature = "capture")]
#[derive(Debug, Deserialize)]
pub struct RecordConfig {
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_spectrogram_image")]
    pub spectrogram_image: PathBuf,
    /// Fingerprints printed by the `fingerprint` command; 0 prints all.
    #[serde(default = "default_max_printed")]
    pub max_printed: usize,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            hop_size: default_hop_size(),
            peak_threshold_ratio: default_peak_threshold_ratio(),
            anchor_distance: default_anchor_distance(),
            frequency_distance: default_frequency_distance(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 2 {
            return Err(FingerprintError::invalid_input(format!(
                "window_size must be at least 2, got {}",
                self.window_size
            )));
        }
        if self.hop_size == 0 {
            return Err(FingerprintError::invalid_input("hop_size must be positive"));
        }
        let ratio = self.peak_threshold_ratio;
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(FingerprintError::invalid_input(format!(
                "peak_threshold_ratio must be within [0, 1], got {}",
                ratio
            )));
        }
        if self.anchor_distance == 0 {
            return Err(FingerprintError::invalid_input("anchor_distance must be positive"));
        }
        Ok(())
    }

    /// Magnitude bins per spectrogram frame.
    pub fn bins_per_frame(&self) -> usize {
        self.window_size / 2
    }
}

#[cfg(feature = "capture")]
impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            spectrogram_image: default_spectrogram_image(),
            max_printed: default_max_printed(),
            format: OutputFormat::default(),
        }
    }
}

fn default_window_size() -> usize { 1024 }
fn default_hop_size() -> usize { 512 }
fn default_peak_threshold_ratio() -> f32 { 0.5 }
fn default_anchor_distance() -> usize { 5 }
fn default_frequency_distance() -> usize { 10 }
#[cfg(feature = "capture")]
fn default_duration_secs() -> u64 { 5 }
fn default_spectrogram_image() -> PathBuf { "spectrogram.png".into() }
fn default_max_printed() -> usize { 10 }

/// Explicit path first, then `peakprint.toml` in the working directory,
/// then the per-user config locations.
pub fn find_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("peakprint.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("peakprint").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("peakprint").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|err| FingerprintError::invalid_input(err.to_string()))
}

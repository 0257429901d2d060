#[cfg(feature = "capture")]
pub mod capture;
pub mod decode;
#[cfg(feature = "capture")]
pub mod microphone;
#[cfg(feature = "capture")]
pub mod wav;

/// Capture and container format shared by every audio collaborator.
pub const SAMPLE_RATE: u32 = 44100;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

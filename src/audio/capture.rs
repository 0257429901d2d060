use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::time::Duration;

use super::wav::WavSink;
use super::SAMPLE_RATE;
use crate::error::Result;

/// Samples per buffer delivered by a capture source.
pub const BUFFER_SIZE: usize = 4096;

/// A producer of 16-bit mono PCM buffers at 44100 Hz.
pub trait SampleSource {
    fn start(&mut self) -> Result<()>;

    /// Blocks until the next buffer arrives. `Ok(None)` once the source has
    /// stopped or run dry.
    fn next_buffer(&mut self) -> Result<Option<Vec<i16>>>;

    fn stop(&mut self) -> Result<()>;

    /// Releases the device. Stopping is implied.
    fn close(&mut self) -> Result<()> {
        self.stop()
    }
}

/// Drives a [`SampleSource`] into a WAV sink for a fixed duration.
pub struct Recorder<S: SampleSource, W: Write + Seek> {
    source: S,
    sink: WavSink<W>,
}

impl<S: SampleSource> Recorder<S, BufWriter<File>> {
    pub fn create(source: S, path: &Path) -> Result<Self> {
        Ok(Self::new(source, WavSink::create(path)?))
    }
}

impl<S: SampleSource, W: Write + Seek> Recorder<S, W> {
    pub fn new(source: S, sink: WavSink<W>) -> Self {
        Self { source, sink }
    }

    /// Records `duration` worth of samples, counted in samples rather than
    /// wall-clock time. `progress` receives (captured, target) after each
    /// buffer. The source is stopped even when capture fails.
    pub fn start<F>(&mut self, duration: Duration, mut progress: F) -> Result<u64>
    where
        F: FnMut(u64, u64),
    {
        let target = (duration.as_secs_f64() * SAMPLE_RATE as f64).round() as u64;
        log::info!("Recording started: {:?} ({} samples)", duration, target);

        self.source.start()?;
        let outcome = self.capture(target, &mut progress);
        let stopped = self.source.stop();

        let captured = outcome?;
        stopped?;
        log::info!("Recording finished: {} samples", captured);
        Ok(captured)
    }

    fn capture(&mut self, target: u64, progress: &mut dyn FnMut(u64, u64)) -> Result<u64> {
        let mut captured = 0u64;
        while captured < target {
            let Some(buffer) = self.source.next_buffer()? else {
                log::warn!("Sample source ended after {} of {} samples", captured, target);
                break;
            };
            let take = buffer.len().min((target - captured) as usize);
            self.sink.write_buffer(&buffer[..take])?;
            captured += take as u64;
            progress(captured, target);
        }
        Ok(captured)
    }

    /// Closes the source and back-patches the WAV header. Returns the total
    /// number of samples in the file.
    pub fn close(mut self) -> Result<u64> {
        let closed = self.source.close();
        let total = self.sink.finalize()?;
        closed?;
        Ok(total)
    }
}

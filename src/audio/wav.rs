use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use super::{BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use crate::error::Result;

pub fn wav_spec() -> WavSpec {
    WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// Streams 16-bit mono PCM into a WAV container.
///
/// The RIFF and data chunk sizes are only correct after [`WavSink::finalize`],
/// which seeks back and patches them with the final sample count.
pub struct WavSink<W: Write + Seek> {
    writer: WavWriter<W>,
    samples_written: u64,
}

impl WavSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        log::debug!("Opened WAV sink at {}", path.display());
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> WavSink<W> {
    pub fn new(inner: W) -> Result<Self> {
        Ok(Self {
            writer: WavWriter::new(inner, wav_spec())?,
            samples_written: 0,
        })
    }

    pub fn write_buffer(&mut self, buffer: &[i16]) -> Result<()> {
        for &sample in buffer {
            self.writer.write_sample(sample)?;
        }
        self.samples_written += buffer.len() as u64;
        Ok(())
    }

    /// Back-patches the header sizes and flushes.
    pub fn finalize(self) -> Result<u64> {
        self.writer.finalize()?;
        Ok(self.samples_written)
    }
}

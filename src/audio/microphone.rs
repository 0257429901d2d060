use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig, SupportedStreamConfigRange,
};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use super::capture::{SampleSource, BUFFER_SIZE};
use super::{CHANNELS, SAMPLE_RATE};
use crate::error::{FingerprintError, Result};

const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Default input device captured at 44100 Hz.
///
/// The cpal callback runs on the backend's audio thread in the device's
/// native sample format; a `Rechunker` converts to 16-bit mono and sends
/// `BUFFER_SIZE` buffers over a channel.
pub struct Microphone {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    receiver: Option<Receiver<Vec<i16>>>,
}

impl Microphone {
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| FingerprintError::device("no default input device found"))?;

        let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
        log::info!("Using input device: {}", name);

        let ranges = device
            .supported_input_configs()
            .map_err(|e| FingerprintError::device(format!("failed to query input configs: {}", e)))?;
        let supported = select_config(ranges)?;
        log::debug!(
            "Input config: {} channel(s), {:?} at {} Hz",
            supported.channels(),
            supported.sample_format(),
            SAMPLE_RATE
        );

        Ok(Self {
            device,
            sample_format: supported.sample_format(),
            config: supported.config(),
            stream: None,
            receiver: None,
        })
    }

    fn build_stream<T>(&self, tx: Sender<Vec<i16>>) -> Result<Stream>
    where
        T: SizedSample + Send + 'static,
        i16: FromSample<T>,
    {
        let mut chunker = Rechunker::new(self.config.channels as usize, tx);
        self.device
            .build_input_stream(
                &self.config,
                move |data: &[T], _: &cpal::InputCallbackInfo| chunker.push(data),
                |err| log::error!("Input stream error: {}", err),
                None,
            )
            .map_err(|e| FingerprintError::device(format!("failed to open input stream: {}", e)))
    }
}

impl SampleSource for Microphone {
    fn start(&mut self) -> Result<()> {
        let (tx, rx) = mpsc::channel();

        let stream = match self.sample_format {
            SampleFormat::I16 => self.build_stream::<i16>(tx),
            SampleFormat::U16 => self.build_stream::<u16>(tx),
            SampleFormat::I32 => self.build_stream::<i32>(tx),
            SampleFormat::F32 => self.build_stream::<f32>(tx),
            other => Err(FingerprintError::device(format!(
                "unsupported input sample format {:?}",
                other
            ))),
        }?;

        stream
            .play()
            .map_err(|e| FingerprintError::device(format!("failed to start recording: {}", e)))?;

        self.stream = Some(stream);
        self.receiver = Some(rx);
        Ok(())
    }

    fn next_buffer(&mut self) -> Result<Option<Vec<i16>>> {
        let Some(rx) = self.receiver.as_ref() else {
            return Ok(None);
        };
        match rx.recv_timeout(READ_TIMEOUT) {
            Ok(buffer) => Ok(Some(buffer)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(FingerprintError::device(format!(
                "no audio received for {:?}",
                READ_TIMEOUT
            ))),
        }
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| FingerprintError::device(format!("failed to stop recording: {}", e)))?;
        }
        self.receiver = None;
        Ok(())
    }
}

fn is_convertible(format: SampleFormat) -> bool {
    matches!(
        format,
        SampleFormat::I16 | SampleFormat::U16 | SampleFormat::I32 | SampleFormat::F32
    )
}

/// A config range that covers 44100 Hz in a convertible sample format.
/// Mono is preferred; otherwise the fewest channels, of which only the
/// first is kept.
fn select_config<I>(ranges: I) -> Result<SupportedStreamConfig>
where
    I: IntoIterator<Item = SupportedStreamConfigRange>,
{
    ranges
        .into_iter()
        .filter(|r| r.channels() > 0)
        .filter(|r| r.min_sample_rate().0 <= SAMPLE_RATE && SAMPLE_RATE <= r.max_sample_rate().0)
        .filter(|r| is_convertible(r.sample_format()))
        .min_by_key(|r| (r.channels() != CHANNELS, r.channels()))
        .map(|r| r.with_sample_rate(cpal::SampleRate(SAMPLE_RATE)))
        .ok_or_else(|| {
            FingerprintError::device(format!(
                "input device cannot capture {} Hz in a 16-bit, 32-bit or float format",
                SAMPLE_RATE
            ))
        })
}

/// Takes the first channel of interleaved callback data, converts it to
/// i16 and emits fixed `BUFFER_SIZE` buffers.
struct Rechunker {
    channels: usize,
    pending: Vec<i16>,
    tx: Sender<Vec<i16>>,
}

impl Rechunker {
    fn new(channels: usize, tx: Sender<Vec<i16>>) -> Self {
        Self {
            channels: channels.max(1),
            pending: Vec::with_capacity(BUFFER_SIZE),
            tx,
        }
    }

    fn push<T>(&mut self, data: &[T])
    where
        T: Sample,
        i16: FromSample<T>,
    {
        for frame in data.chunks(self.channels) {
            self.pending.push(i16::from_sample(frame[0]));
            if self.pending.len() == BUFFER_SIZE {
                let full = std::mem::replace(&mut self.pending, Vec::with_capacity(BUFFER_SIZE));
                // receiver gone means the recorder already stopped
                let _ = self.tx.send(full);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::{SampleRate, SupportedBufferSize};

    fn range(channels: u16, min: u32, max: u32, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn prefers_mono_at_capture_rate() {
        let chosen = select_config(vec![
            range(2, 44100, 48000, SampleFormat::F32),
            range(1, 8000, 96000, SampleFormat::I16),
            range(1, 48000, 48000, SampleFormat::F32),
        ])
        .unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.sample_format(), SampleFormat::I16);
        assert_eq!(chosen.sample_rate(), SampleRate(44100));
    }

    #[test]
    fn falls_back_to_fewest_channels() {
        let chosen = select_config(vec![
            range(4, 44100, 44100, SampleFormat::I16),
            range(2, 44100, 44100, SampleFormat::U16),
        ])
        .unwrap();
        assert_eq!(chosen.channels(), 2);
        assert_eq!(chosen.sample_format(), SampleFormat::U16);
    }

    #[test]
    fn rejects_devices_without_capture_rate_or_format() {
        let err = select_config(vec![range(1, 48000, 96000, SampleFormat::I16)]).unwrap_err();
        assert!(matches!(err, FingerprintError::Device(_)));
        assert!(err.to_string().contains("44100"));

        let err = select_config(vec![range(1, 44100, 44100, SampleFormat::F64)]).unwrap_err();
        assert!(matches!(err, FingerprintError::Device(_)));

        assert!(select_config(Vec::new()).is_err());
    }

    #[test]
    fn rechunker_keeps_first_channel_of_i16_input() {
        let (tx, rx) = mpsc::channel();
        let mut chunker = Rechunker::new(2, tx);
        let interleaved: Vec<i16> = (0..BUFFER_SIZE as i16).flat_map(|i| [i, -1]).collect();

        chunker.push(&interleaved[..1000]);
        assert!(rx.try_recv().is_err());
        chunker.push(&interleaved[1000..]);

        let buffer = rx.try_recv().unwrap();
        assert_eq!(buffer.len(), BUFFER_SIZE);
        assert!(buffer.iter().enumerate().all(|(i, &s)| s == i as i16));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn rechunker_converts_unsigned_and_float_samples() {
        let (tx, rx) = mpsc::channel();
        let mut chunker = Rechunker::new(1, tx);
        chunker.push(vec![32768u16; BUFFER_SIZE].as_slice());
        assert!(rx.try_recv().unwrap().iter().all(|&s| s == 0));

        chunker.push(vec![0.5f32; BUFFER_SIZE].as_slice());
        assert!(rx.try_recv().unwrap().iter().all(|&s| (s - 16384).abs() <= 1));

        chunker.push(vec![0u16; BUFFER_SIZE].as_slice());
        assert!(rx.try_recv().unwrap().iter().all(|&s| s == i16::MIN));
    }

    #[test]
    fn rechunker_survives_a_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        let mut chunker = Rechunker::new(1, tx);
        drop(rx);
        chunker.push(vec![1i16; BUFFER_SIZE * 2].as_slice());
    }
}

use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use crate::error::{FingerprintError, Result};
use crate::fingerprint::Waveform;

pub fn decode_wav_file(path: &Path) -> Result<Waveform> {
    let bytes = std::fs::read(path)?;
    log::debug!("Read {} bytes from {}", bytes.len(), path.display());
    decode_wav(bytes)
}

/// Decode a 44100 Hz mono 16-bit WAV into a normalized waveform.
pub fn decode_wav(bytes: Vec<u8>) -> Result<Waveform> {
    if !has_wav_magic(&bytes) {
        return Err(FingerprintError::unsupported("not a RIFF/WAVE stream"));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(container_error)?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FingerprintError::unsupported("no audio track found"))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| FingerprintError::unsupported("unknown sample rate"))?;
    if sample_rate != SAMPLE_RATE {
        return Err(FingerprintError::unsupported(format!(
            "sample rate {} Hz, expected {} Hz",
            sample_rate, SAMPLE_RATE
        )));
    }

    let channels = params.channels.map_or(1, |c| c.count());
    if channels != CHANNELS as usize {
        return Err(FingerprintError::unsupported(format!(
            "{} channels, expected mono",
            channels
        )));
    }

    if let Some(bits) = params.bits_per_sample {
        if bits != BITS_PER_SAMPLE as u32 {
            return Err(FingerprintError::unsupported(format!(
                "{}-bit samples, expected {}-bit",
                bits, BITS_PER_SAMPLE
            )));
        }
    }

    let mut decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;

    let mut pcm: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(container_error(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<i16>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        pcm.extend_from_slice(sample_buf.samples());
    }

    let waveform = Waveform::from_pcm16(&pcm, sample_rate);
    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        waveform.len(),
        sample_rate,
        waveform.duration_secs()
    );

    Ok(waveform)
}

fn has_wav_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// The bytes are already in memory, so a read failure means a truncated or
/// malformed container rather than a filesystem problem.
fn container_error(err: SymphoniaError) -> FingerprintError {
    match err {
        SymphoniaError::IoError(e) => {
            FingerprintError::unsupported(format!("malformed WAV container: {}", e))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn encode_wav(samples: &[i16]) -> Vec<u8> {
        wav_bytes(44100, 1, samples)
    }

    #[test]
    fn round_trip_reproduces_samples() {
        let pcm: Vec<i16> = (0..5000)
            .map(|i| ((i * 37) % 65536) as i32 - 32768)
            .map(|v| v as i16)
            .collect();
        let bytes = encode_wav(&pcm);
        let waveform = decode_wav(bytes).unwrap();

        assert_eq!(waveform.sample_rate(), 44100);
        let restored: Vec<i16> = waveform
            .samples()
            .iter()
            .map(|&s| (s * 32768.0) as i16)
            .collect();
        assert_eq!(restored, pcm);
    }

    #[test]
    fn rejects_non_wav_bytes() {
        let err = decode_wav(b"ID3\x04\x00\x00 definitely not a wave file".to_vec()).unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedFormat(_)));
        assert!(matches!(decode_wav(Vec::new()), Err(FingerprintError::UnsupportedFormat(_))));
    }

    fn hound_bytes(sample_rate: u32, channels: u16) -> Vec<u8> {
        let samples: Vec<i16> = (0..2048).map(|i| (i % 100) as i16).collect();
        wav_bytes(sample_rate, channels, &samples)
    }

    #[test]
    fn rejects_wrong_sample_rate() {
        let err = decode_wav(hound_bytes(48000, 1)).unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedFormat(_)));
        assert!(err.to_string().contains("48000"));
    }

    #[test]
    fn rejects_stereo() {
        let err = decode_wav(hound_bytes(44100, 2)).unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedFormat(_)));
    }

    #[test]
    fn truncated_container_is_unsupported_format() {
        let header_only = b"RIFF\x24\0\0\0WAVEfmt \x10\0\0".to_vec();
        let err = decode_wav(header_only).unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedFormat(_)), "{:?}", err);

        let bytes = encode_wav(&[1, 2, 3, 4]);
        let err = decode_wav(bytes[..30].to_vec()).unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedFormat(_)), "{:?}", err);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = decode_wav_file(Path::new("/nonexistent/peakprint/input.wav")).unwrap_err();
        assert!(matches!(err, FingerprintError::Io(_)));
    }

    #[test]
    fn decodes_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, encode_wav(&[0, 8192, -8192, 0])).unwrap();
        let waveform = decode_wav_file(&path).unwrap();
        assert_eq!(waveform.samples(), &[0.0, 0.25, -0.25, 0.0]);
    }
}

//! Decoding of audio artifacts to normalized samples

use std::io::Cursor;
use std::path::Path;

use crate::{Error, Result};

/// Interleaved samples in [-1, 1] plus the stream parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    /// Number of frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / usize::from(self.channels)
    }
}

/// Decode an audio file, picking the codec from its header
///
/// WAV is recognized by its RIFF/WAVE header; everything else goes
/// through the MP3 decoder.
///
/// # Errors
///
/// Returns `Error::Decode` if the file cannot be read or decoded
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let data = std::fs::read(path)
        .map_err(|e| Error::Decode(format!("cannot read {}: {e}", path.display())))?;

    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
        decode_wav(&data)
    } else {
        decode_mp3(&data)
    }
}

/// Decode MP3 bytes, keeping every channel interleaved
///
/// # Errors
///
/// Returns `Error::Decode` on a corrupt stream or when no frame is found
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut params: Option<(u32, u16)> = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let frame_params = (frame.sample_rate as u32, frame.channels as u16);
                match params {
                    None => params = Some(frame_params),
                    Some(p) if p != frame_params => {
                        return Err(Error::Decode(format!(
                            "MP3 stream changes format mid-stream: {p:?} -> {frame_params:?}"
                        )));
                    }
                    Some(_) => {}
                }
                samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
            }
            // ID3 tags and junk between frames
            Err(minimp3::Error::SkippedData) => {}
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    let (sample_rate, channels) =
        params.ok_or_else(|| Error::Decode("no MP3 frames found".to_string()))?;

    tracing::debug!(
        samples = samples.len(),
        sample_rate,
        channels,
        "decoded MP3"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Decode WAV bytes (integer or float PCM)
///
/// # Errors
///
/// Returns `Error::Decode` if the container or samples are malformed
#[allow(clippy::cast_precision_loss)]
pub fn decode_wav(wav_data: &[u8]) -> Result<DecodedAudio> {
    let mut reader =
        hound::WavReader::new(Cursor::new(wav_data)).map_err(|e| Error::Decode(e.to_string()))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Decode(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Decode(e.to_string()))?
        }
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
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

    #[test]
    fn test_decode_wav_normalizes() {
        let data = wav_bytes(&[0, 16384, -32768, 32767], 2, 22050);
        let decoded = decode_wav(&data).unwrap();

        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.frames(), 2);
        assert_eq!(decoded.samples[0], 0.0);
        assert_eq!(decoded.samples[1], 0.5);
        assert_eq!(decoded.samples[2], -1.0);
        assert!(decoded.samples[3] < 1.0);
    }

    #[test]
    fn test_decode_mp3_garbage() {
        let err = decode_mp3(b"definitely not an mp3 stream").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_file_missing() {
        let err = decode_file(Path::new("/nonexistent/dir/phrase.mp3")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_file_sniffs_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("answer.bin");
        std::fs::write(&path, wav_bytes(&[100, -100, 200], 1, 16000)).unwrap();

        let decoded = decode_file(&path).unwrap();
        assert_eq!(decoded.samples.len(), 3);
        assert_eq!(decoded.channels, 1);
    }
}

//! Additive Gaussian noise injection

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand_distr::StandardNormal;

use super::decode::{DecodedAudio, decode_file};
use crate::{Error, Result};

/// Add `N(0, 1) * intensity` to every sample and hard-clamp to [-1, 1]
///
/// An intensity of 0 leaves the samples untouched and draws nothing from
/// `rng`.
pub fn inject_noise<R: Rng + ?Sized>(samples: &mut [f32], intensity: f64, rng: &mut R) {
    if intensity == 0.0 {
        return;
    }

    for sample in samples.iter_mut() {
        let noise: f64 = rng.sample(StandardNormal);
        #[allow(clippy::cast_possible_truncation)]
        let noisy = (f64::from(*sample) + noise * intensity).clamp(-1.0, 1.0) as f32;
        *sample = noisy;
    }
}

/// Output path for the degraded artifact: `<stem>_noisy.wav` beside the input
#[must_use]
pub fn noisy_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "audio".into(), |s| s.to_string_lossy());
    input.with_file_name(format!("{stem}_noisy.wav"))
}

/// Write samples as 16-bit PCM WAV
///
/// # Errors
///
/// Returns `Error::Encode` if the file cannot be created or written
#[allow(clippy::cast_possible_truncation)]
pub fn write_wav(path: &Path, audio: &DecodedAudio) -> Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let file = std::fs::File::create(path)
        .map_err(|e| Error::Encode(format!("cannot create {}: {e}", path.display())))?;
    let mut writer = hound::WavWriter::new(BufWriter::new(file), spec)
        .map_err(|e| Error::Encode(e.to_string()))?;

    for &sample in &audio.samples {
        // Inverse of the decoder's 1/32768 scaling
        let sample_i16 = (f64::from(sample) * 32768.0)
            .round()
            .clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| Error::Encode(e.to_string()))?;
    }

    writer.finalize().map_err(|e| Error::Encode(e.to_string()))?;
    Ok(())
}

/// Degrades synthesized speech with calibrated noise
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseInjector;

impl NoiseInjector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Check that an intensity is usable
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for negative, NaN or infinite values
    pub fn validate(intensity: f64) -> Result<()> {
        if intensity.is_finite() && intensity >= 0.0 {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "noise intensity must be a finite value >= 0, got {intensity}"
            )))
        }
    }

    /// Decode `input`, inject noise and write `<stem>_noisy.wav` next to it
    ///
    /// The input file is left untouched. Returns the path of the new artifact.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad intensity, `Error::Decode` if the
    /// input cannot be decoded and `Error::Encode` if the output cannot be written
    pub fn process<R: Rng + ?Sized>(
        &self,
        input: &Path,
        intensity: f64,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let output = noisy_output_path(input);
        self.process_to(input, &output, intensity, rng)?;
        Ok(output)
    }

    /// Same as [`Self::process`] with an explicit output path
    ///
    /// # Errors
    ///
    /// See [`Self::process`]
    pub fn process_to<R: Rng + ?Sized>(
        &self,
        input: &Path,
        output: &Path,
        intensity: f64,
        rng: &mut R,
    ) -> Result<()> {
        Self::validate(intensity)?;

        let mut audio = decode_file(input)?;
        inject_noise(&mut audio.samples, intensity, rng);
        write_wav(output, &audio)?;

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            intensity,
            samples = audio.samples.len(),
            sample_rate = audio.sample_rate,
            channels = audio.channels,
            "noise injected"
        );

        Ok(())
    }
}

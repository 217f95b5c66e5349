//! Audio artifact handling
//!
//! Decodes synthesized speech, degrades it with additive noise and writes
//! the practice artifact as 16-bit PCM WAV.

mod decode;
mod noise;

pub use decode::{DecodedAudio, decode_file, decode_mp3, decode_wav};
pub use noise::{NoiseInjector, inject_noise, noisy_output_path, write_wav};

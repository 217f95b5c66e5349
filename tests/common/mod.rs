//! Shared test utilities

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use speech_drill::db::{Phrase, PhraseRepo, Scenario, ScenarioRepo, User, UserRepo};
use speech_drill::{DbPool, Error, PracticePipeline, Result, SpeechToText, TextToSpeech, db};

/// Real MP3 fixture: 22.05 kHz mono speech
pub fn mp3_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/speech.mp3")
}

/// Sample rate of generated fixtures
pub const SAMPLE_RATE: u32 = 16_000;

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Rows a phrase-stream needs to exist
pub struct Seed {
    pub user: User,
    pub scenario: Scenario,
    pub phrase: Phrase,
}

/// Create a user, a scenario and one phrase
pub fn seed(db: &DbPool, phrase_text: &str) -> Seed {
    let user = UserRepo::new(db.clone())
        .create("Test Student", "student")
        .expect("failed to create test user");
    let scenario = ScenarioRepo::new(db.clone())
        .create(user.id, "airport", "active")
        .expect("failed to create test scenario");
    let phrase = PhraseRepo::new(db.clone())
        .create(phrase_text, None)
        .expect("failed to create test phrase");
    Seed {
        user,
        scenario,
        phrase,
    }
}

/// Write a 16-bit sine WAV fixture and return its path
pub fn write_sine_wav(path: &Path, channels: u16, frames: usize) -> PathBuf {
    let spec = hound::WavSpec {
        channels,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("failed to create wav");
    for i in 0..frames {
        let t = i as f32 / SAMPLE_RATE as f32;
        let value = (0.25 * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 32767.0) as i16;
        for _ in 0..channels {
            writer.write_sample(value).expect("failed to write sample");
        }
    }
    writer.finalize().expect("failed to finalize wav");
    path.to_path_buf()
}

/// Read back every sample of a WAV file with its spec
pub fn read_wav(path: &Path) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).expect("failed to open wav");
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .expect("failed to read samples");
    (spec, samples)
}

/// Files currently in a directory
pub fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .expect("failed to read dir")
        .map(|e| e.expect("bad dir entry").path())
        .collect();
    entries.sort();
    entries
}

/// TTS double that serves a local WAV fixture
pub struct FakeTts {
    fixture: Option<PathBuf>,
    calls: AtomicUsize,
}

impl FakeTts {
    /// Respond to every synthesis with a copy of `fixture`
    pub fn serving(fixture: PathBuf) -> Self {
        Self {
            fixture: Some(fixture),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every synthesis like a 500 from the service
    pub fn failing() -> Self {
        Self {
            fixture: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextToSpeech for FakeTts {
    async fn synthesize(&self, _text: &str, output: &Path, _accent: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fixture {
            Some(fixture) => {
                tokio::fs::copy(fixture, output).await?;
                Ok(())
            }
            None => Err(Error::Tts(
                "TTS API error 500 Internal Server Error: unavailable".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "fake-tts"
    }
}

/// STT double returning a fixed transcript
pub struct FakeStt {
    transcript: Option<String>,
    calls: AtomicUsize,
}

impl FakeStt {
    pub fn hearing(transcript: &str) -> Self {
        Self {
            transcript: Some(transcript.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for FakeStt {
    async fn recognize(&self, _audio: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Suspend like a network call so concurrent evaluations interleave
        tokio::task::yield_now().await;
        self.transcript
            .clone()
            .ok_or_else(|| Error::Stt("STT API error 500 Internal Server Error".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake-stt"
    }
}

/// Build a pipeline over the given doubles
pub fn pipeline(
    db: &DbPool,
    tts: Arc<FakeTts>,
    stt: Arc<FakeStt>,
    audio_dir: &Path,
) -> PracticePipeline {
    PracticePipeline::new(db.clone(), tts, stt, audio_dir.to_path_buf())
}

//! Practice pipeline
//!
//! Sequences the two halves of a phrase-stream's life:
//!
//! ```text
//! practice:  phrase ─▶ TTS ─▶ <id>.mp3 ─▶ noise ─▶ <id>_noisy.wav ─▶ audio_phrase + phrase_stream
//! evaluate:  answer audio ─▶ STT ─▶ transcript ─▶ score ─▶ audio_answer + answer + status
//! ```
//!
//! Every failure is surfaced as `Error::Practice` or `Error::Evaluation`
//! wrapping the stage cause. Nothing is retried here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

use crate::audio::NoiseInjector;
use crate::db::{
    AnswerRepo, AudioPhrase, DbPool, EvaluationRecord, NewPhraseStream, PhraseRepo, PhraseStream,
    ScenarioRepo, StreamRepo, StreamStatus,
};
use crate::scoring::SimilarityScorer;
use crate::speech::{SpeechToText, TextToSpeech};
use crate::{Error, Result};

/// Request to create a phrase-stream
#[derive(Debug, Clone)]
pub struct PracticeRequest {
    pub phrase_id: Uuid,
    pub scenario_id: Uuid,
    /// Voice/accent selector passed to the TTS service
    pub accent: String,
    /// Standard deviation of the added noise, relative to full scale
    pub noise: f64,
    /// Seed for the noise; fresh entropy when `None`
    pub seed: Option<u64>,
}

/// A created phrase-stream and its practice audio
#[derive(Debug, Clone)]
pub struct Practice {
    pub stream: PhraseStream,
    pub audio: AudioPhrase,
}

/// Request to evaluate a recorded answer
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub audio_path: PathBuf,
    pub record_time: DateTime<Utc>,
}

/// Result of evaluating an answer
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Evaluation {
    pub answer_id: Uuid,
    pub is_correct: bool,
    pub transcript: String,
    pub similarity: f64,
}

/// Drives synthesis and evaluation for phrase-streams
pub struct PracticePipeline {
    tts: Arc<dyn TextToSpeech>,
    stt: Arc<dyn SpeechToText>,
    injector: NoiseInjector,
    scorer: SimilarityScorer,
    phrases: PhraseRepo,
    scenarios: ScenarioRepo,
    streams: StreamRepo,
    answers: AnswerRepo,
    audio_dir: PathBuf,
}

impl PracticePipeline {
    /// Create a pipeline writing artifacts to `audio_dir`
    #[must_use]
    pub fn new(
        pool: DbPool,
        tts: Arc<dyn TextToSpeech>,
        stt: Arc<dyn SpeechToText>,
        audio_dir: PathBuf,
    ) -> Self {
        Self {
            tts,
            stt,
            injector: NoiseInjector::new(),
            scorer: SimilarityScorer::default(),
            phrases: PhraseRepo::new(pool.clone()),
            scenarios: ScenarioRepo::new(pool.clone()),
            streams: StreamRepo::new(pool.clone()),
            answers: AnswerRepo::new(pool),
            audio_dir,
        }
    }

    /// Replace the default scorer
    #[must_use]
    pub const fn with_scorer(mut self, scorer: SimilarityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Synthesize, degrade and persist a new phrase-stream
    ///
    /// # Errors
    ///
    /// Returns `Error::Practice` wrapping the failed stage. Artifacts written
    /// for this request are removed before returning.
    pub async fn create_phrase_stream(&self, request: &PracticeRequest) -> Result<Practice> {
        self.practice(request).await.map_err(Error::practice)
    }

    async fn practice(&self, request: &PracticeRequest) -> Result<Practice> {
        NoiseInjector::validate(request.noise)?;
        let phrase = self.phrases.get(request.phrase_id)?;
        // Both lookups precede synthesis
        let scenario = self.scenarios.get(request.scenario_id)?;

        let stream_id = Uuid::new_v4();
        let raw_path = self.audio_dir.join(format!("{stream_id}.mp3"));

        tracing::info!(
            stream_id = %stream_id,
            phrase_id = %phrase.id,
            accent = %request.accent,
            noise = request.noise,
            tts = self.tts.name(),
            "synthesizing practice audio"
        );

        if let Err(e) = self
            .tts
            .synthesize(&phrase.text, &raw_path, &request.accent)
            .await
        {
            // The service may have failed after the body was written
            remove_artifacts(&[&raw_path]).await;
            return Err(e);
        }

        let noisy_path = match self.degrade(&raw_path, request).await {
            Ok(path) => path,
            Err(e) => {
                remove_artifacts(&[&raw_path]).await;
                return Err(e);
            }
        };

        let created = self.streams.create(&NewPhraseStream {
            stream_id,
            phrase_id: phrase.id,
            scenario_id: scenario.id,
            path_to_audio: noisy_path.clone(),
            accent: request.accent.clone(),
            noise: request.noise,
        });

        match created {
            Ok((audio, stream)) => {
                tracing::info!(
                    stream_id = %stream.id,
                    audio = %audio.path_to_audio.display(),
                    "phrase-stream initialized"
                );
                Ok(Practice { stream, audio })
            }
            Err(e) => {
                remove_artifacts(&[&raw_path, &noisy_path]).await;
                Err(e)
            }
        }
    }

    /// Run noise injection off the async runtime
    async fn degrade(&self, raw_path: &Path, request: &PracticeRequest) -> Result<PathBuf> {
        let injector = self.injector;
        let input = raw_path.to_path_buf();
        let noise = request.noise;
        let seed = request.seed;

        tokio::task::spawn_blocking(move || {
            let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            injector.process(&input, noise, &mut rng)
        })
        .await
        .map_err(|e| Error::Encode(format!("noise injection task failed: {e}")))?
    }

    /// Transcribe, score and record an answer, closing the phrase-stream
    ///
    /// # Errors
    ///
    /// Returns `Error::Evaluation` wrapping the failed stage; a phrase-stream
    /// that was already evaluated yields a wrapped `Error::Conflict`
    pub async fn evaluate_answer(&self, request: &AnswerRequest) -> Result<Evaluation> {
        self.evaluate(request).await.map_err(Error::evaluation)
    }

    async fn evaluate(&self, request: &AnswerRequest) -> Result<Evaluation> {
        let stream = self.streams.get(request.stream_id)?;
        if stream.status.is_terminal() {
            return Err(Error::Conflict(format!(
                "phrase-stream {} was already evaluated ({})",
                stream.id, stream.status
            )));
        }
        let phrase = self.phrases.get(stream.phrase_id)?;

        tracing::info!(
            stream_id = %stream.id,
            audio = %request.audio_path.display(),
            stt = self.stt.name(),
            "transcribing answer"
        );

        let transcript = self.stt.recognize(&request.audio_path).await?;
        let verdict = self.scorer.score(&phrase.text, &transcript);

        let (_, answer) = self.answers.record_evaluation(&EvaluationRecord {
            stream_id: stream.id,
            user_id: request.user_id,
            audio_path: request.audio_path.clone(),
            record_time: request.record_time,
            transcript: transcript.clone(),
            is_correct: verdict.is_correct,
        })?;

        tracing::info!(
            stream_id = %stream.id,
            answer_id = %answer.id,
            similarity = verdict.similarity,
            status = %StreamStatus::from_verdict(verdict.is_correct),
            "answer evaluated"
        );

        Ok(Evaluation {
            answer_id: answer.id,
            is_correct: verdict.is_correct,
            transcript,
            similarity: verdict.similarity,
        })
    }
}

async fn remove_artifacts(paths: &[&Path]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed partial artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove partial artifact");
            }
        }
    }
}

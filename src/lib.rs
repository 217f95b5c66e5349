//! Speech Drill - listening and pronunciation drills
//!
//! This library provides the answer evaluation pipeline:
//! - Phrase synthesis through a cloud TTS service
//! - Noise injection to simulate degraded listening conditions
//! - Answer transcription through a cloud STT service
//! - Bag-of-words scoring and phrase-stream state transitions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 PracticePipeline                     │
//! │   create_phrase_stream   │   evaluate_answer         │
//! └──────┬───────────┬───────┴──────┬──────────┬────────┘
//!        │           │              │          │
//! ┌──────▼───┐ ┌─────▼────────┐ ┌───▼────┐ ┌───▼──────────────┐
//! │   TTS    │ │ NoiseInjector│ │  STT   │ │ SimilarityScorer │
//! └──────────┘ └──────────────┘ └────────┘ └──────────────────┘
//!        │                          │
//! ┌──────▼──────────────────────────▼───────────────────┐
//! │           SQLite (phrases, streams, answers)         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod speech;

pub use audio::{DecodedAudio, NoiseInjector};
pub use config::Config;
pub use db::{DbConn, DbPool, StreamStatus};
pub use error::{Error, Result};
pub use pipeline::{AnswerRequest, Evaluation, Practice, PracticePipeline, PracticeRequest};
pub use scoring::{SimilarityScorer, Verdict, cosine_similarity};
pub use speech::{CloudStt, CloudTts, SpeechToText, TextToSpeech};

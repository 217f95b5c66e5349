//! Answer persistence
//!
//! Recording an evaluation writes the audio answer, the scored answer and the
//! phrase-stream transition in a single transaction. The transition only
//! applies to a phrase-stream that is still `initialized`, so a phrase-stream
//! is closed at most once even when evaluations race.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::stream::StreamStatus;
use super::{DbPool, parse_datetime, uuid_col};
use crate::{Error, Result};

/// A student's raw recording; never modified after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAnswer {
    pub id: Uuid,
    pub path_to_audio: PathBuf,
    pub record_time: DateTime<Utc>,
}

/// Scored transcript of an audio answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub audio_answer_id: Uuid,
    pub text: String,
    pub is_correct: bool,
}

/// Outcome of one evaluation, ready to persist
#[derive(Debug, Clone)]
pub struct EvaluationRecord {
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub audio_path: PathBuf,
    pub record_time: DateTime<Utc>,
    pub transcript: String,
    pub is_correct: bool,
}

/// Answer repository
#[derive(Clone)]
pub struct AnswerRepo {
    pool: DbPool,
}

impl AnswerRepo {
    /// Create a new answer repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert the audio answer and answer, and close the phrase-stream
    ///
    /// Either all three writes happen or none do.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the phrase-stream does not exist,
    /// `Error::Conflict` if it was already evaluated, or a database error
    pub fn record_evaluation(&self, record: &EvaluationRecord) -> Result<(AudioAnswer, Answer)> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let tx = conn.transaction()?;

        let audio_answer = AudioAnswer {
            id: Uuid::new_v4(),
            path_to_audio: record.audio_path.clone(),
            record_time: record.record_time,
        };
        tx.execute(
            "INSERT INTO audio_answers (id, path_to_audio, record_time) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                audio_answer.id.to_string(),
                audio_answer.path_to_audio.to_string_lossy().into_owned(),
                audio_answer.record_time.to_rfc3339()
            ],
        )?;

        let answer = Answer {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            audio_answer_id: audio_answer.id,
            text: record.transcript.clone(),
            is_correct: record.is_correct,
        };
        tx.execute(
            "INSERT INTO answers (id, user_id, audio_answer_id, text, is_correct)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                answer.id.to_string(),
                answer.user_id.to_string(),
                answer.audio_answer_id.to_string(),
                answer.text,
                answer.is_correct
            ],
        )?;

        let status = StreamStatus::from_verdict(record.is_correct);
        let updated = tx.execute(
            "UPDATE phrase_streams SET answer_id = ?2, status = ?3
             WHERE id = ?1 AND status = ?4",
            rusqlite::params![
                record.stream_id.to_string(),
                answer.id.to_string(),
                status.as_str(),
                StreamStatus::Initialized.as_str()
            ],
        )?;

        if updated == 0 {
            let exists = tx
                .query_row(
                    "SELECT 1 FROM phrase_streams WHERE id = ?1",
                    [record.stream_id.to_string()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            // Dropping `tx` rolls back both inserts
            return Err(if exists {
                Error::Conflict(format!(
                    "phrase-stream {} was already evaluated",
                    record.stream_id
                ))
            } else {
                Error::NotFound(format!("phrase-stream {}", record.stream_id))
            });
        }

        tx.commit()?;

        tracing::debug!(
            stream_id = %record.stream_id,
            answer_id = %answer.id,
            status = %status,
            "recorded evaluation"
        );

        Ok((audio_answer, answer))
    }

    /// Look up an answer by id
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such answer exists
    pub fn get(&self, id: Uuid) -> Result<Answer> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, user_id, audio_answer_id, text, is_correct FROM answers WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(Answer {
                    id: uuid_col(row, 0)?,
                    user_id: uuid_col(row, 1)?,
                    audio_answer_id: uuid_col(row, 2)?,
                    text: row.get(3)?,
                    is_correct: row.get(4)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("answer {id}")))
    }

    /// Look up an audio answer by id
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such audio answer exists
    pub fn get_audio_answer(&self, id: Uuid) -> Result<AudioAnswer> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, path_to_audio, record_time FROM audio_answers WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(AudioAnswer {
                    id: uuid_col(row, 0)?,
                    path_to_audio: PathBuf::from(row.get::<_, String>(1)?),
                    record_time: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("audio answer {id}")))
    }

    /// Number of stored answers
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count(&self) -> Result<usize> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM answers", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

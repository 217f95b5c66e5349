//! Phrase-stream and audio-phrase persistence

use std::path::PathBuf;
use std::str::FromStr;

use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::{DbPool, opt_uuid_col, uuid_col};
use crate::{Error, Result};

/// Lifecycle of a phrase-stream: `initialized` until its answer is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Initialized,
    Success,
    Fail,
}

impl StreamStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }

    /// Terminal status for a verdict
    #[must_use]
    pub const fn from_verdict(is_correct: bool) -> Self {
        if is_correct { Self::Success } else { Self::Fail }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Initialized)
    }
}

impl FromStr for StreamStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initialized" => Ok(Self::Initialized),
            "success" => Ok(Self::Success),
            "fail" => Ok(Self::Fail),
            other => Err(Error::Database(format!("unknown phrase-stream status: {other}"))),
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthesized practice audio; never modified after creation
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPhrase {
    pub id: Uuid,
    pub path_to_audio: PathBuf,
    pub phrase_id: Uuid,
    pub accent: String,
    pub noise: f64,
}

/// One practice attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseStream {
    pub id: Uuid,
    pub audio_phrase_id: Uuid,
    pub scenario_id: Uuid,
    pub answer_id: Option<Uuid>,
    pub phrase_id: Uuid,
    pub status: StreamStatus,
}

/// Everything needed to persist a freshly synthesized phrase-stream
#[derive(Debug, Clone)]
pub struct NewPhraseStream {
    pub stream_id: Uuid,
    pub phrase_id: Uuid,
    pub scenario_id: Uuid,
    pub path_to_audio: PathBuf,
    pub accent: String,
    pub noise: f64,
}

/// One row of a student's progress report
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PhraseProgress {
    pub phrase: String,
    pub phrase_stream_status: String,
    pub scenario_status: String,
}

/// Phrase-stream repository
#[derive(Clone)]
pub struct StreamRepo {
    pool: DbPool,
}

fn map_stream(row: &rusqlite::Row<'_>) -> rusqlite::Result<(PhraseStream, String)> {
    Ok((
        PhraseStream {
            id: uuid_col(row, 0)?,
            audio_phrase_id: uuid_col(row, 1)?,
            scenario_id: uuid_col(row, 2)?,
            answer_id: opt_uuid_col(row, 3)?,
            phrase_id: uuid_col(row, 4)?,
            status: StreamStatus::Initialized,
        },
        row.get(5)?,
    ))
}

impl StreamRepo {
    /// Create a new phrase-stream repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist the audio phrase and its `initialized` phrase-stream together
    ///
    /// # Errors
    ///
    /// Returns error if a referenced row is missing or the database operation
    /// fails; nothing is written in that case
    pub fn create(&self, new: &NewPhraseStream) -> Result<(AudioPhrase, PhraseStream)> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let tx = conn.transaction()?;

        let audio_id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO audio_phrases (id, path_to_audio, phrase_id, accent, noise)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                audio_id.to_string(),
                new.path_to_audio.to_string_lossy().into_owned(),
                new.phrase_id.to_string(),
                new.accent,
                new.noise
            ],
        )?;

        tx.execute(
            "INSERT INTO phrase_streams (id, audio_phrase_id, scenario_id, answer_id, phrase_id, status)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
            rusqlite::params![
                new.stream_id.to_string(),
                audio_id.to_string(),
                new.scenario_id.to_string(),
                new.phrase_id.to_string(),
                StreamStatus::Initialized.as_str()
            ],
        )?;

        tx.commit()?;

        tracing::debug!(stream_id = %new.stream_id, audio_phrase_id = %audio_id, "created phrase-stream");

        Ok((
            AudioPhrase {
                id: audio_id,
                path_to_audio: new.path_to_audio.clone(),
                phrase_id: new.phrase_id,
                accent: new.accent.clone(),
                noise: new.noise,
            },
            PhraseStream {
                id: new.stream_id,
                audio_phrase_id: audio_id,
                scenario_id: new.scenario_id,
                answer_id: None,
                phrase_id: new.phrase_id,
                status: StreamStatus::Initialized,
            },
        ))
    }

    /// Look up a phrase-stream by id
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such phrase-stream exists
    pub fn get(&self, id: Uuid) -> Result<PhraseStream> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let (mut stream, status) = conn
            .query_row(
                "SELECT id, audio_phrase_id, scenario_id, answer_id, phrase_id, status
                 FROM phrase_streams WHERE id = ?1",
                [id.to_string()],
                map_stream,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("phrase-stream {id}")))?;

        stream.status = status.parse()?;
        Ok(stream)
    }

    /// Look up an audio phrase by id
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such audio phrase exists
    pub fn get_audio_phrase(&self, id: Uuid) -> Result<AudioPhrase> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, path_to_audio, phrase_id, accent, noise FROM audio_phrases WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(AudioPhrase {
                    id: uuid_col(row, 0)?,
                    path_to_audio: PathBuf::from(row.get::<_, String>(1)?),
                    phrase_id: uuid_col(row, 2)?,
                    accent: row.get(3)?,
                    noise: row.get(4)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("audio phrase {id}")))
    }

    /// Texts of every phrase practised in the user's scenarios
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn student_phrases(&self, user_id: Uuid) -> Result<Vec<String>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT p.text FROM phrases p
             JOIN phrase_streams ps ON p.id = ps.phrase_id
             JOIN scenarios s ON s.id = ps.scenario_id
             WHERE s.user_id = ?1
             ORDER BY s.start_date, ps.rowid",
        )?;

        let phrases = stmt
            .query_map([user_id.to_string()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(phrases)
    }

    /// Phrase, phrase-stream status and scenario status for each attempt
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn student_progress(&self, user_id: Uuid) -> Result<Vec<PhraseProgress>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT p.text, ps.status, s.status FROM phrases p
             JOIN phrase_streams ps ON p.id = ps.phrase_id
             JOIN scenarios s ON s.id = ps.scenario_id
             WHERE s.user_id = ?1
             ORDER BY s.start_date, ps.rowid",
        )?;

        let progress = stmt
            .query_map([user_id.to_string()], |row| {
                Ok(PhraseProgress {
                    phrase: row.get(0)?,
                    phrase_stream_status: row.get(1)?,
                    scenario_status: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PhraseRepo, ScenarioRepo, UserRepo, init_memory};

    struct Fixture {
        repo: StreamRepo,
        user_id: Uuid,
        scenario_id: Uuid,
        phrase_id: Uuid,
    }

    fn setup() -> Fixture {
        let pool = init_memory().unwrap();
        let user = UserRepo::new(pool.clone()).create("Ada", "ada").unwrap();
        let scenario = ScenarioRepo::new(pool.clone())
            .create(user.id, "airport", "active")
            .unwrap();
        let phrase = PhraseRepo::new(pool.clone())
            .create("hello world", None)
            .unwrap();

        Fixture {
            repo: StreamRepo::new(pool),
            user_id: user.id,
            scenario_id: scenario.id,
            phrase_id: phrase.id,
        }
    }

    fn new_stream(f: &Fixture) -> NewPhraseStream {
        let stream_id = Uuid::new_v4();
        NewPhraseStream {
            stream_id,
            phrase_id: f.phrase_id,
            scenario_id: f.scenario_id,
            path_to_audio: PathBuf::from(format!("/audio/{stream_id}_noisy.wav")),
            accent: "british".to_string(),
            noise: 0.05,
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [StreamStatus::Initialized, StreamStatus::Success, StreamStatus::Fail] {
            assert_eq!(status.as_str().parse::<StreamStatus>().unwrap(), status);
        }
        assert!("completed".parse::<StreamStatus>().is_err());
        assert_eq!(StreamStatus::from_verdict(true), StreamStatus::Success);
        assert_eq!(StreamStatus::from_verdict(false), StreamStatus::Fail);
        assert!(!StreamStatus::Initialized.is_terminal());
    }

    #[test]
    fn test_create_and_get() {
        let f = setup();
        let new = new_stream(&f);

        let (audio, stream) = f.repo.create(&new).unwrap();
        assert_eq!(stream.status, StreamStatus::Initialized);
        assert_eq!(stream.answer_id, None);
        assert_eq!(stream.audio_phrase_id, audio.id);

        assert_eq!(f.repo.get(new.stream_id).unwrap(), stream);
        assert_eq!(f.repo.get_audio_phrase(audio.id).unwrap(), audio);
    }

    #[test]
    fn test_create_is_atomic() {
        let f = setup();
        let mut new = new_stream(&f);
        new.scenario_id = Uuid::new_v4();

        assert!(f.repo.create(&new).is_err());

        let conn = f.repo.pool.get().unwrap();
        let audio_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM audio_phrases", [], |row| row.get(0))
            .unwrap();
        assert_eq!(audio_rows, 0);
    }

    #[test]
    fn test_get_missing() {
        let f = setup();
        assert!(matches!(f.repo.get(Uuid::new_v4()), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_progress_queries() {
        let f = setup();
        f.repo.create(&new_stream(&f)).unwrap();
        f.repo.create(&new_stream(&f)).unwrap();

        let phrases = f.repo.student_phrases(f.user_id).unwrap();
        assert_eq!(phrases, vec!["hello world", "hello world"]);

        let progress = f.repo.student_progress(f.user_id).unwrap();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0].phrase_stream_status, "initialized");
        assert_eq!(progress[0].scenario_status, "active");

        assert!(f.repo.student_phrases(Uuid::new_v4()).unwrap().is_empty());
    }
}

//! Phrase repository

use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::{DbPool, opt_uuid_col, uuid_col};
use crate::{Error, Result};

/// Reference text a student must reproduce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub id: Uuid,
    pub text: String,
    pub type_id: Option<Uuid>,
}

/// Phrase category (e.g. "weather report", "radio check")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseType {
    pub id: Uuid,
    pub title: String,
}

/// Phrase repository
#[derive(Clone)]
pub struct PhraseRepo {
    pool: DbPool,
}

impl PhraseRepo {
    /// Create a new phrase repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a phrase type
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn create_type(&self, title: &str) -> Result<PhraseType> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO phrase_types (id, title) VALUES (?1, ?2)",
            rusqlite::params![id.to_string(), title],
        )?;

        Ok(PhraseType {
            id,
            title: title.to_string(),
        })
    }

    /// Insert a phrase
    ///
    /// # Errors
    ///
    /// Returns error if the type does not exist or database operation fails
    pub fn create(&self, text: &str, type_id: Option<Uuid>) -> Result<Phrase> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO phrases (id, text, type_id) VALUES (?1, ?2, ?3)",
            rusqlite::params![id.to_string(), text, type_id.map(|t| t.to_string())],
        )?;

        tracing::debug!(phrase_id = %id, "created phrase");
        Ok(Phrase {
            id,
            text: text.to_string(),
            type_id,
        })
    }

    /// Look up a phrase by id
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such phrase exists
    pub fn get(&self, id: Uuid) -> Result<Phrase> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, text, type_id FROM phrases WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(Phrase {
                    id: uuid_col(row, 0)?,
                    text: row.get(1)?,
                    type_id: opt_uuid_col(row, 2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("phrase {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[test]
    fn test_create_and_get() {
        let repo = PhraseRepo::new(init_memory().unwrap());

        let kind = repo.create_type("greetings").unwrap();
        let phrase = repo.create("hello world", Some(kind.id)).unwrap();

        let loaded = repo.get(phrase.id).unwrap();
        assert_eq!(loaded.text, "hello world");
        assert_eq!(loaded.type_id, Some(kind.id));
    }

    #[test]
    fn test_untyped_phrase() {
        let repo = PhraseRepo::new(init_memory().unwrap());

        let phrase = repo.create("over and out", None).unwrap();
        assert_eq!(repo.get(phrase.id).unwrap().type_id, None);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let repo = PhraseRepo::new(init_memory().unwrap());
        assert!(repo.create("hello", Some(Uuid::new_v4())).is_err());
    }

    #[test]
    fn test_get_missing() {
        let repo = PhraseRepo::new(init_memory().unwrap());
        assert!(matches!(repo.get(Uuid::new_v4()), Err(Error::NotFound(_))));
    }
}

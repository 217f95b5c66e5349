//! Scenario repository
//!
//! Scenario status belongs to whoever manages the session; the pipeline only
//! reads it for progress reports.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::{DbPool, parse_datetime, uuid_col};
use crate::{Error, Result};

/// A practice session grouping phrase-streams for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub user_id: Uuid,
}

/// Scenario repository
#[derive(Clone)]
pub struct ScenarioRepo {
    pool: DbPool,
}

impl ScenarioRepo {
    /// Create a new scenario repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a scenario starting now
    ///
    /// # Errors
    ///
    /// Returns error if the user does not exist or database operation fails
    pub fn create(&self, user_id: Uuid, title: &str, status: &str) -> Result<Scenario> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4();
        let start = Utc::now();
        conn.execute(
            "INSERT INTO scenarios (id, title, status, start_date, end_date, user_id)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
            rusqlite::params![
                id.to_string(),
                title,
                status,
                start.to_rfc3339(),
                user_id.to_string()
            ],
        )?;

        Ok(Scenario {
            id,
            title: title.to_string(),
            status: status.to_string(),
            start_date: Some(parse_datetime(&start.to_rfc3339())),
            end_date: None,
            user_id,
        })
    }

    /// Look up a scenario by id
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such scenario exists
    pub fn get(&self, id: Uuid) -> Result<Scenario> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, title, status, start_date, end_date, user_id
             FROM scenarios WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(Scenario {
                    id: uuid_col(row, 0)?,
                    title: row.get(1)?,
                    status: row.get(2)?,
                    start_date: row
                        .get::<_, Option<String>>(3)?
                        .map(|s| parse_datetime(&s)),
                    end_date: row
                        .get::<_, Option<String>>(4)?
                        .map(|s| parse_datetime(&s)),
                    user_id: uuid_col(row, 5)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("scenario {id}")))
    }
}

//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Users (students and instructors)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            login TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Phrase categories
        CREATE TABLE IF NOT EXISTS phrase_types (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL
        );

        -- Reference phrases
        CREATE TABLE IF NOT EXISTS phrases (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            type_id TEXT REFERENCES phrase_types(id)
        );

        -- Practice sessions
        CREATE TABLE IF NOT EXISTS scenarios (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            status TEXT NOT NULL,
            start_date TEXT,
            end_date TEXT,
            user_id TEXT NOT NULL REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_scenarios_user ON scenarios(user_id);

        -- Synthesized (and degraded) practice audio
        CREATE TABLE IF NOT EXISTS audio_phrases (
            id TEXT PRIMARY KEY,
            path_to_audio TEXT NOT NULL,
            phrase_id TEXT NOT NULL REFERENCES phrases(id),
            accent TEXT NOT NULL DEFAULT '',
            noise REAL NOT NULL CHECK(noise >= 0)
        );

        -- Recorded student answers
        CREATE TABLE IF NOT EXISTS audio_answers (
            id TEXT PRIMARY KEY,
            path_to_audio TEXT NOT NULL,
            record_time TEXT NOT NULL
        );

        -- Scored answers
        CREATE TABLE IF NOT EXISTS answers (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            audio_answer_id TEXT NOT NULL REFERENCES audio_answers(id),
            text TEXT NOT NULL,
            is_correct INTEGER NOT NULL
        );

        -- Practice attempts
        CREATE TABLE IF NOT EXISTS phrase_streams (
            id TEXT PRIMARY KEY,
            audio_phrase_id TEXT NOT NULL REFERENCES audio_phrases(id),
            scenario_id TEXT NOT NULL REFERENCES scenarios(id),
            answer_id TEXT REFERENCES answers(id),
            phrase_id TEXT NOT NULL REFERENCES phrases(id),
            status TEXT NOT NULL CHECK(status IN ('initialized', 'success', 'fail'))
        );

        CREATE INDEX IF NOT EXISTS idx_phrase_streams_scenario ON phrase_streams(scenario_id);

        PRAGMA user_version = 1;
        ",
    )?;

    tracing::info!("migrated to schema v1");
    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- One answer can close at most one phrase-stream
        CREATE UNIQUE INDEX IF NOT EXISTS idx_phrase_streams_answer
            ON phrase_streams(answer_id) WHERE answer_id IS NOT NULL;

        PRAGMA user_version = 2;
        ",
    )?;

    tracing::info!("migrated to schema v2");
    Ok(())
}

//! User lookups
//!
//! Account management lives outside this crate; answers only need a row to
//! reference.

use rusqlite::OptionalExtension;
use uuid::Uuid;

use super::{DbPool, uuid_col};
use crate::{Error, Result};

/// A student or instructor account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub login: String,
}

/// User repository
#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    /// Create a new user repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a user
    ///
    /// # Errors
    ///
    /// Returns error if the login is taken or the database operation fails
    pub fn create(&self, name: &str, login: &str) -> Result<User> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO users (id, name, login) VALUES (?1, ?2, ?3)",
            rusqlite::params![id.to_string(), name, login],
        )?;

        tracing::debug!(user_id = %id, login, "created user");
        Ok(User {
            id,
            name: name.to_string(),
            login: login.to_string(),
        })
    }

    /// Look up a user by id
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such user exists
    pub fn get(&self, id: Uuid) -> Result<User> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, name, login FROM users WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(User {
                    id: uuid_col(row, 0)?,
                    name: row.get(1)?,
                    login: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[test]
    fn test_create_and_get() {
        let repo = UserRepo::new(init_memory().unwrap());

        let user = repo.create("Ada", "ada").unwrap();
        assert_eq!(repo.get(user.id).unwrap(), user);
    }

    #[test]
    fn test_duplicate_login() {
        let repo = UserRepo::new(init_memory().unwrap());

        repo.create("Ada", "ada").unwrap();
        assert!(repo.create("Other Ada", "ada").is_err());
    }

    #[test]
    fn test_get_missing() {
        let repo = UserRepo::new(init_memory().unwrap());
        assert!(matches!(repo.get(Uuid::new_v4()), Err(Error::NotFound(_))));
    }
}

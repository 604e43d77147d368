//! User identity mapping

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};

impl Database {
    /// Get the id for an external identity, creating the user row if needed
    pub fn ensure_user(&self, email: &str) -> Result<i64> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::Validation("User email cannot be empty".to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (email) VALUES (?) ON CONFLICT(email) DO NOTHING",
            params![email],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM users WHERE email = ?",
            params![email],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Look up a user id without creating it
    pub fn find_user(&self, email: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?",
                params![email.trim()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

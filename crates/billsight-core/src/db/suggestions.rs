//! Suggestion inbox operations

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{json_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewSuggestion, Suggestion};

const SUGGESTION_COLUMNS: &str =
    "id, user_id, suggestion_type, title, description, related_data, is_read, is_dismissed, created_at";

impl Database {
    /// Create a suggestion for a user
    pub fn create_suggestion(&self, user_id: i64, suggestion: &NewSuggestion) -> Result<Suggestion> {
        if suggestion.title.trim().is_empty() {
            return Err(Error::Validation("Suggestion title is required".to_string()));
        }

        let related_json = serde_json::to_string(&suggestion.related_data)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO suggestions (user_id, suggestion_type, title, description, related_data)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                suggestion.suggestion_type.as_str(),
                suggestion.title.trim(),
                suggestion.description,
                related_json,
            ],
        )?;
        let id = conn.last_insert_rowid();

        info!(
            id,
            user_id,
            suggestion_type = suggestion.suggestion_type.as_str(),
            "Created suggestion"
        );

        let sql = format!("SELECT {} FROM suggestions WHERE id = ?", SUGGESTION_COLUMNS);
        let created = conn.query_row(&sql, params![id], row_to_suggestion)?;
        Ok(created)
    }

    /// List a user's suggestions, newest first
    ///
    /// Dismissed suggestions are hidden unless `include_dismissed` is set.
    pub fn list_suggestions(&self, user_id: i64, include_dismissed: bool) -> Result<Vec<Suggestion>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM suggestions
            WHERE user_id = ? AND (? OR is_dismissed = 0)
            ORDER BY created_at DESC, id DESC
            "#,
            SUGGESTION_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let suggestions = stmt
            .query_map(params![user_id, include_dismissed], row_to_suggestion)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(suggestions)
    }

    /// Get one of a user's suggestions
    pub fn get_suggestion(&self, user_id: i64, id: i64) -> Result<Option<Suggestion>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM suggestions WHERE id = ? AND user_id = ?",
            SUGGESTION_COLUMNS
        );
        let suggestion = conn
            .query_row(&sql, params![id, user_id], row_to_suggestion)
            .optional()?;
        Ok(suggestion)
    }

    /// Mark a suggestion as read (idempotent)
    pub fn mark_suggestion_read(&self, user_id: i64, id: i64) -> Result<Suggestion> {
        self.set_suggestion_flag(user_id, id, "is_read")
    }

    /// Dismiss a suggestion (idempotent); the row is kept
    pub fn dismiss_suggestion(&self, user_id: i64, id: i64) -> Result<Suggestion> {
        self.set_suggestion_flag(user_id, id, "is_dismissed")
    }

    fn set_suggestion_flag(&self, user_id: i64, id: i64, column: &'static str) -> Result<Suggestion> {
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE suggestions SET {} = 1 WHERE id = ? AND user_id = ?",
            column
        );
        let updated = conn.execute(&sql, params![id, user_id])?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Suggestion {}", id)));
        }

        let sql = format!("SELECT {} FROM suggestions WHERE id = ?", SUGGESTION_COLUMNS);
        let suggestion = conn.query_row(&sql, params![id], row_to_suggestion)?;
        Ok(suggestion)
    }
}

fn row_to_suggestion(row: &rusqlite::Row) -> rusqlite::Result<Suggestion> {
    let suggestion_type: String = row.get(2)?;
    let created_at: String = row.get(8)?;
    Ok(Suggestion {
        id: row.get(0)?,
        user_id: row.get(1)?,
        suggestion_type: suggestion_type.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
        })?,
        title: row.get(3)?,
        description: row.get(4)?,
        related_data: json_column(row, 5)?,
        is_read: row.get(6)?,
        is_dismissed: row.get(7)?,
        created_at: parse_datetime(&created_at),
    })
}

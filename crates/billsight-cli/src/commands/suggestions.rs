//! Suggestion command implementations

use anyhow::Result;
use billsight_core::db::Database;
use billsight_core::models::{NewSuggestion, SuggestionType};

use super::truncate;

pub fn cmd_suggestions_list(db: &Database, user_id: i64, include_dismissed: bool) -> Result<()> {
    let suggestions = db.list_suggestions(user_id, include_dismissed)?;

    if suggestions.is_empty() {
        println!("✅ No suggestions right now.");
        return Ok(());
    }

    println!();
    println!("💡 Suggestions");
    println!("   ─────────────────────────────────────────────────────────────");

    for s in suggestions {
        let marker = if s.is_dismissed {
            "✗"
        } else if s.is_read {
            " "
        } else {
            "●"
        };
        println!(
            "   {} [{}] {:<18} {}",
            marker,
            s.id,
            s.suggestion_type.label(),
            truncate(&s.title, 40)
        );
        if !s.description.is_empty() {
            println!("            {}", truncate(&s.description, 60));
        }
    }

    Ok(())
}

pub fn cmd_suggestions_add(
    db: &Database,
    user_id: i64,
    suggestion_type: &str,
    title: &str,
    description: &str,
) -> Result<()> {
    let suggestion_type: SuggestionType = suggestion_type.parse().map_err(anyhow::Error::msg)?;

    let suggestion = db.create_suggestion(
        user_id,
        &NewSuggestion {
            suggestion_type,
            title: title.to_string(),
            description: description.to_string(),
            related_data: serde_json::json!({}),
        },
    )?;

    println!(
        "✅ Added {} suggestion #{}: {}",
        suggestion.suggestion_type.label(),
        suggestion.id,
        suggestion.title
    );

    Ok(())
}

pub fn cmd_suggestions_read(db: &Database, user_id: i64, id: i64) -> Result<()> {
    db.mark_suggestion_read(user_id, id)?;
    println!("✅ Suggestion #{} marked as read", id);
    Ok(())
}

pub fn cmd_suggestions_dismiss(db: &Database, user_id: i64, id: i64) -> Result<()> {
    db.dismiss_suggestion(user_id, id)?;
    println!("✅ Suggestion #{} dismissed (still listed with --all)", id);
    Ok(())
}

//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `open_user_db` - Open the database and resolve the acting user
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use billsight_core::db::Database;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Open the database and make sure the acting user exists
pub fn open_user_db(db_path: &Path, user: &str, no_encrypt: bool) -> Result<(Database, i64)> {
    let db = open_db(db_path, no_encrypt)?;
    let user_id = db
        .ensure_user(user)
        .with_context(|| format!("Failed to resolve user '{}'", user))?;
    Ok((db, user_id))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    if db.is_encrypted() {
        println!("   🔒 Encryption: ENABLED");
    } else {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record a bill: billsight bills add --file bill.json");
    println!("  2. See this week: billsight weekly");
    println!("  3. Start web API: billsight serve");

    Ok(())
}

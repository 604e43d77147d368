//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, open_user_db)
//! - `bills` - Bill commands (add, list, show, delete, correct, verify, stats)
//! - `analytics` - Weekly/monthly analyses and the dashboard
//! - `suggestions` - Suggestion inbox commands
//! - `serve` - Web server command

pub mod analytics;
pub mod bills;
pub mod core;
pub mod serve;
pub mod suggestions;

// Re-export command functions for main.rs
pub use analytics::*;
pub use bills::*;
pub use core::*;
pub use serve::*;
pub use suggestions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

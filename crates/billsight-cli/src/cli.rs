//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Billsight - Weekly and monthly spend analytics for your bills
#[derive(Parser)]
#[command(name = "billsight")]
#[command(about = "Self-hosted bill tracking and spend analytics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "billsight.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to $BILLSIGHT_CONFIG, then ~/.config/billsight/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// User whose bills and analyses are read
    #[arg(long, default_value = "local", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set BILLSIGHT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage bills
    Bills {
        #[command(subcommand)]
        action: Option<BillsAction>,
    },

    /// Show the weekly analysis (cached until --refresh)
    Weekly {
        /// Weeks before the current week
        #[arg(short, long, default_value = "0")]
        offset: u32,

        /// Recompute the snapshot from current bills
        #[arg(short, long)]
        refresh: bool,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the monthly analysis (cached until --refresh)
    Monthly {
        /// Months before the current month
        #[arg(short, long, default_value = "0")]
        offset: u32,

        /// Recompute the snapshot from current bills
        #[arg(short, long)]
        refresh: bool,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show live spend totals (current month, last 7 days, all time)
    Dashboard,

    /// Manage suggestions
    Suggestions {
        #[command(subcommand)]
        action: Option<SuggestionsAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on (defaults to [server].port in config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to [server].host in config)
        #[arg(long)]
        host: Option<String>,

        /// Disable authentication (for local development only)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
pub enum BillsAction {
    /// Add a bill from a JSON file
    Add {
        /// JSON file with the bill and its items
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List bills, newest first
    List {
        /// Filter by status: pending, verified, corrected
        #[arg(long)]
        status: Option<String>,

        /// Only bills on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only bills on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Search bill number, vendor and notes
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a bill with its items
    Show {
        /// Bill ID
        id: i64,
    },

    /// Delete a bill
    Delete {
        /// Bill ID
        id: i64,
    },

    /// Correct one field of a bill
    Correct {
        /// Bill ID
        id: i64,

        /// Field: bill_number, vendor_name, date, total_amount, tax_amount, notes
        field: String,

        /// Value as recorded
        original: String,

        /// Value it should have been
        corrected: String,
    },

    /// Mark a bill verified
    Verify {
        /// Bill ID
        id: i64,
    },

    /// Totals and average over all bills
    Stats,
}

#[derive(Subcommand)]
pub enum SuggestionsAction {
    /// List suggestions, newest first
    List {
        /// Include dismissed suggestions
        #[arg(short, long)]
        all: bool,
    },

    /// Add a suggestion
    Add {
        /// Type: cost_saving, trend, anomaly, recommendation
        #[arg(short = 't', long = "type")]
        suggestion_type: String,

        /// Short title
        #[arg(long)]
        title: String,

        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Mark a suggestion as read
    Read {
        /// Suggestion ID
        id: i64,
    },

    /// Dismiss a suggestion (it stays in history)
    Dismiss {
        /// Suggestion ID
        id: i64,
    },
}

//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `users` - Mapping external identities to user ids
//! - `bills` - Bill and line item CRUD, corrections, stats
//! - `analyses` - Weekly/monthly snapshot store (get-or-create, refresh)
//! - `dashboard` - Live dashboard aggregates
//! - `suggestions` - Suggestion inbox (read/dismiss lifecycle)
//! - `audit` - Audit log of API and CLI access

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::{Error, Result};

mod analyses;
mod audit;
mod bill_filter;
mod bills;
mod dashboard;
mod suggestions;
mod users;

pub use bill_filter::{BillFilter, FilterResult};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "BILLSIGHT_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"billsight-salt-1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Read a TEXT column holding a fixed-point decimal
pub(crate) fn decimal_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a nullable DATE column
pub(crate) fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

/// Read a TEXT column holding a JSON document
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Canonical storage form for money: two fraction digits
pub(crate) fn money_text(value: Decimal) -> String {
    crate::models::round_money(value).to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Whether connections are opened with a SQLCipher key
    encrypted: bool,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `BILLSIGHT_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `BILLSIGHT_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `BILLSIGHT_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let encrypted = passphrase.is_some();
        let key_pragma = match passphrase {
            Some(pass) => Some(format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?)),
            None => None,
        };

        // Runs on every new pooled connection: the key must be set before any
        // other statement, and foreign keys are a per-connection setting.
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(ref pragma) = key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self { pool, encrypted };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each pooled
    /// connection to `:memory:` would see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "billsight_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Whether this database was opened with an encryption key
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Users (identity is external; this maps an email to a stable id)
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Bills
            -- Money columns are canonical decimal TEXT ("12.50") so sums stay exact
            CREATE TABLE IF NOT EXISTS bills (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                bill_number TEXT NOT NULL DEFAULT '',
                vendor_name TEXT NOT NULL DEFAULT '',
                date DATE,
                total_amount TEXT NOT NULL DEFAULT '0.00',
                tax_amount TEXT NOT NULL DEFAULT '0.00',
                status TEXT NOT NULL DEFAULT 'pending',        -- pending, verified, corrected
                notes TEXT NOT NULL DEFAULT '',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_bills_user_created ON bills(user_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_bills_user_date ON bills(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_bills_status ON bills(status);

            -- Bill line items
            CREATE TABLE IF NOT EXISTS bill_items (
                id INTEGER PRIMARY KEY,
                bill_id INTEGER NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                quantity TEXT NOT NULL DEFAULT '1.00',
                unit_price TEXT NOT NULL,
                total_price TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT '',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_bill_items_bill ON bill_items(bill_id);

            -- Bill corrections (user fixes to recorded values)
            CREATE TABLE IF NOT EXISTS bill_corrections (
                id INTEGER PRIMARY KEY,
                bill_id INTEGER NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
                field_name TEXT NOT NULL,
                original_value TEXT NOT NULL,
                corrected_value TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_bill_corrections_bill ON bill_corrections(bill_id);

            -- Weekly analysis snapshots (one per user and Monday-aligned week)
            CREATE TABLE IF NOT EXISTS weekly_analyses (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                week_start DATE NOT NULL,
                week_end DATE NOT NULL,
                total_bills INTEGER NOT NULL DEFAULT 0,
                total_amount TEXT NOT NULL DEFAULT '0.00',
                total_tax TEXT NOT NULL DEFAULT '0.00',
                average_bill_amount TEXT NOT NULL DEFAULT '0.00',
                category_breakdown TEXT NOT NULL DEFAULT '{}',  -- JSON: category -> float
                top_vendors TEXT NOT NULL DEFAULT '[]',         -- JSON: [{vendor_name, total, count}]
                trend_data TEXT NOT NULL DEFAULT '{}',          -- JSON: date -> amount
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, week_start)
            );

            -- Monthly analysis snapshots (one per user and calendar month)
            CREATE TABLE IF NOT EXISTS monthly_analyses (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                total_bills INTEGER NOT NULL DEFAULT 0,
                total_amount TEXT NOT NULL DEFAULT '0.00',
                total_tax TEXT NOT NULL DEFAULT '0.00',
                average_bill_amount TEXT NOT NULL DEFAULT '0.00',
                category_breakdown TEXT NOT NULL DEFAULT '{}',
                top_vendors TEXT NOT NULL DEFAULT '[]',
                trend_data TEXT NOT NULL DEFAULT '{}',
                growth_percentage TEXT NOT NULL DEFAULT '0.00',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, year, month)
            );

            -- Suggestions (user-facing notices)
            CREATE TABLE IF NOT EXISTS suggestions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                suggestion_type TEXT NOT NULL,  -- cost_saving, trend, anomaly, recommendation
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                related_data TEXT NOT NULL DEFAULT '{}',
                is_read BOOLEAN NOT NULL DEFAULT 0,
                is_dismissed BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_suggestions_user ON suggestions(user_id, created_at);

            -- Audit log (tracks API and CLI access)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                user_email TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id INTEGER,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_user ON audit_log(user_email);
            CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

/// Audit log entry
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_email: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests;

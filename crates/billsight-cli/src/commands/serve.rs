//! Server command implementation

use std::path::Path;

use anyhow::Result;
use billsight_core::Config;
use billsight_server::{parse_api_keys, ServerConfig, API_KEYS_ENV};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    config: &Config,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Billsight web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    // Parse API keys from environment (comma-separated)
    let api_keys = parse_api_keys(&std::env::var(API_KEYS_ENV).unwrap_or_default());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: identity header (Cf-Access / X-User-Email)");
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured ({})",
                api_keys.len(),
                API_KEYS_ENV
            );
        }
    }
    if !config.server.allowed_origins.is_empty() {
        println!(
            "   🌐 CORS origins: {}",
            config.server.allowed_origins.join(", ")
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let server_config = ServerConfig {
        require_auth: !no_auth,
        allowed_origins: config.server.allowed_origins.clone(),
        api_keys,
        analytics: config.analytics,
    };

    billsight_server::serve_with_config(db, host, port, server_config).await?;

    Ok(())
}

//! Billsight CLI - Bill tracking and spend analytics
//!
//! Usage:
//!   billsight init                   Initialize database
//!   billsight bills add --file B     Record a bill from JSON
//!   billsight weekly --offset 1      Last week's analysis
//!   billsight serve --port 3000      Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use billsight_core::{Config, SystemClock};
use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let clock = SystemClock;

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
        } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            commands::cmd_serve(&cli.db, &config, &host, port, no_auth, cli.no_encrypt).await
        }
        Commands::Bills { action } => {
            let (db, user_id) = commands::open_user_db(&cli.db, &cli.user, cli.no_encrypt)?;
            match action {
                None => commands::cmd_bills_list(&db, user_id, None, None, None, None),
                Some(BillsAction::List {
                    status,
                    from,
                    to,
                    search,
                }) => commands::cmd_bills_list(
                    &db,
                    user_id,
                    status.as_deref(),
                    from.as_deref(),
                    to.as_deref(),
                    search.as_deref(),
                ),
                Some(BillsAction::Add { file }) => commands::cmd_bills_add(&db, user_id, &file),
                Some(BillsAction::Show { id }) => commands::cmd_bills_show(&db, user_id, id),
                Some(BillsAction::Delete { id }) => commands::cmd_bills_delete(&db, user_id, id),
                Some(BillsAction::Correct {
                    id,
                    field,
                    original,
                    corrected,
                }) => commands::cmd_bills_correct(&db, user_id, id, &field, &original, &corrected),
                Some(BillsAction::Verify { id }) => commands::cmd_bills_verify(&db, user_id, id),
                Some(BillsAction::Stats) => commands::cmd_bills_stats(&db, user_id),
            }
        }
        Commands::Weekly {
            offset,
            refresh,
            json,
        } => {
            let (db, user_id) = commands::open_user_db(&cli.db, &cli.user, cli.no_encrypt)?;
            commands::cmd_weekly(&db, &clock, config.analytics, user_id, offset, refresh, json)
        }
        Commands::Monthly {
            offset,
            refresh,
            json,
        } => {
            let (db, user_id) = commands::open_user_db(&cli.db, &cli.user, cli.no_encrypt)?;
            commands::cmd_monthly(&db, &clock, config.analytics, user_id, offset, refresh, json)
        }
        Commands::Dashboard => {
            let (db, user_id) = commands::open_user_db(&cli.db, &cli.user, cli.no_encrypt)?;
            commands::cmd_dashboard(&db, &clock, config.analytics, user_id)
        }
        Commands::Suggestions { action } => {
            let (db, user_id) = commands::open_user_db(&cli.db, &cli.user, cli.no_encrypt)?;
            match action {
                None => commands::cmd_suggestions_list(&db, user_id, false),
                Some(SuggestionsAction::List { all }) => {
                    commands::cmd_suggestions_list(&db, user_id, all)
                }
                Some(SuggestionsAction::Add {
                    suggestion_type,
                    title,
                    description,
                }) => commands::cmd_suggestions_add(
                    &db,
                    user_id,
                    &suggestion_type,
                    &title,
                    &description,
                ),
                Some(SuggestionsAction::Read { id }) => {
                    commands::cmd_suggestions_read(&db, user_id, id)
                }
                Some(SuggestionsAction::Dismiss { id }) => {
                    commands::cmd_suggestions_dismiss(&db, user_id, id)
                }
            }
        }
    }
}

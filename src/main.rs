#![allow(clippy::result_large_err)]

use auction_desk::{
    bot::{self, BotData},
    config::{database, seed, settings},
    core::{
        events::{self, ChangeFeed},
        player,
    },
    errors::{Error, Result},
};
use dotenvy::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {e}"))?;
    info!(
        teams = app_config.teams.len(),
        bidding_status = ?app_config.auction.bidding_status,
        "Successfully processed application configuration."
    );

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed configured teams
    let feed = ChangeFeed::new();
    seed::seed_teams(
        &db,
        &app_config.teams,
        &app_config.auction.placeholder_logo,
        &feed,
    )
    .await
    .inspect_err(|e| error!("Failed to seed teams: {e}"))?;

    // Optional bulk import of registrations before the bot starts
    if let Ok(path) = env::var("AUCTION_PLAYERS_FILE") {
        let summary = player::import_players_file(&db, &app_config.auction, &path, &feed)
            .await
            .inspect_err(|e| error!("Failed to import players from {path}: {e}"))?;
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            skipped = summary.skipped,
            "Imported players from {path}"
        );
    }

    // 6. Poll the auction state as a backstop for missed notifications
    let backstop = events::spawn_state_backstop(
        db.clone(),
        feed.clone(),
        app_config.auction.poll_interval(),
    );

    // 7. Run the bot
    // DISCORD_BOT_TOKEN is read directly before use, not stored in the config
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    let result = bot::run_bot(token, BotData::new(db, app_config.auction, feed)).await;
    backstop.abort();
    result
}

//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the operator console and the spectator display for the auction,
//! including all slash commands, autocomplete handlers, and bot context management.

/// Discord command implementations (auction, management, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;
/// Text and embed rendering of read models
pub mod views;

use crate::{
    config::settings::AuctionSettings,
    core::{assets::LocalAssetStore, events::ChangeFeed},
    errors::{Error, ErrorKind, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

/// Shared data available to all bot commands.
/// This structure holds the database connection, the auction rules and the change feed
/// that commands publish to and live views listen on.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Auction rules from config.toml
    pub settings: AuctionSettings,
    /// Change notifications
    pub feed: ChangeFeed,
    /// Where uploaded photos and logos are written
    pub assets: LocalAssetStore,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub fn new(database: DatabaseConnection, settings: AuctionSettings, feed: ChangeFeed) -> Self {
        let assets = LocalAssetStore::new(&settings.asset_root, settings.asset_base_url.clone());
        Self {
            database,
            settings,
            feed,
            assets,
        }
    }
}

/// Message shown to the operator for a failed command.
#[must_use]
pub fn operator_message(error: &Error) -> String {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::Constraint => format!("❌ {error}"),
        ErrorKind::Transient => {
            "❌ Something went wrong talking to the database. Please try again.".to_string()
        }
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            match error.kind() {
                ErrorKind::Transient => {
                    error!("Error in command `{}`: {error:?}", ctx.command().name);
                }
                ErrorKind::Validation | ErrorKind::Constraint => {
                    warn!("Command `{}` refused: {error}", ctx.command().name);
                }
            }
            if let Err(e) = ctx.say(operator_message(&error)).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Registers every command and runs the Discord client until it stops.
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::start_auction(),
                commands::stop_auction(),
                commands::next_player(),
                commands::advance(),
                commands::sell(),
                commands::unsold(),
                commands::board(),
                commands::display(),
                commands::standings(),
                commands::roster(),
                commands::transactions(),
                commands::edit_transaction(),
                commands::delete_transaction(),
                commands::team(),
                commands::player(),
                commands::import_players(),
                commands::export(),
                commands::audit(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}

pub use commands::*;
pub use handlers::*;

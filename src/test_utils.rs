//! Shared test utilities for the auction desk.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::settings::{AuctionSettings, BiddingStatusMode},
    core::{events::ChangeFeed, ledger, player, team},
    entities::{
        self,
        player::{PlayerCategory, PlayerType},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PHONE: AtomicU64 = AtomicU64::new(9_000_000_000);

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// In-memory database plus a fresh change feed and default settings.
pub async fn setup_auction() -> Result<(DatabaseConnection, ChangeFeed, AuctionSettings)> {
    Ok((setup_test_db().await?, ChangeFeed::new(), AuctionSettings::default()))
}

/// Default settings with the selected player marked `bidding`.
pub fn persisted_settings() -> AuctionSettings {
    AuctionSettings {
        bidding_status: BiddingStatusMode::Persisted,
        ..AuctionSettings::default()
    }
}

/// Creates a team with the given budget and no logo.
pub async fn create_test_team(
    db: &DatabaseConnection,
    name: &str,
    base_budget: i64,
) -> Result<entities::team::Model> {
    team::create_team(db, name, "", base_budget, &ChangeFeed::new()).await
}

/// Player details with sensible defaults.
///
/// # Defaults
/// * category: All Rounder
/// * `player_type`: Regular
/// * `is_valid_player`: true
pub fn test_player_details(name: &str, phone: &str, base_price: i64) -> player::PlayerDetails {
    player::PlayerDetails {
        name: name.to_string(),
        age: "25".to_string(),
        category: PlayerCategory::AllRounder,
        phone: phone.to_string(),
        photo_url: String::new(),
        player_type: PlayerType::Regular,
        base_price,
        auction_serial_number: None,
        is_valid_player: true,
        jersey_number: None,
        jersey_name: None,
    }
}

/// Creates an unsold player with a phone number no other test player shares.
pub async fn create_test_player(
    db: &DatabaseConnection,
    name: &str,
    base_price: i64,
) -> Result<entities::player::Model> {
    let phone = NEXT_PHONE.fetch_add(1, Ordering::Relaxed).to_string();
    player::create_player(
        db,
        test_player_details(name, &phone, base_price),
        &ChangeFeed::new(),
    )
    .await
}

/// Sells a player at the next free auction order.
pub async fn sell_test_player(
    db: &DatabaseConnection,
    player_id: i64,
    team_id: i64,
    amount: i64,
) -> Result<entities::auction_result::Model> {
    let order = ledger::next_auction_order(db).await?;
    ledger::sell_player(db, player_id, team_id, amount, order, &ChangeFeed::new()).await
}

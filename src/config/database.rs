//! Database configuration module.
//!
//! Handles the `SQLite` connection and creates every table from the entity definitions with
//! `SeaORM`'s `Schema::create_table_from_entity`, so the schema always matches the Rust structs.
//! Unique columns on the entities become the store-level guards the ledger relies on.

use crate::entities::{AuctionResult, AuctionState, Player, Team};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

/// Default location of the auction database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/auction.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the default path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection using [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(&get_database_url()).await.map_err(Into::into)
}

/// Creates all tables if they do not exist yet.
///
/// Tables are created parents first so the foreign keys on `auction_results` resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, Team).await?;
    create_table(db, Player).await?;
    create_table(db, AuctionResult).await?;
    create_table(db, AuctionState).await?;
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

//! Auction state entity - The single row describing the live auction.
//!
//! `version` increases on every write so transitions can be applied as compare-and-swap updates.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Auction state database model. Exactly one row exists, with `id = 1`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auction_state")]
pub struct Model {
    /// Always `1`
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// Player currently on the block
    pub current_player_id: Option<i64>,
    /// Whether the auction is running
    pub is_auction_active: bool,
    /// Whether bids are being taken for the current player
    pub is_bidding_open: bool,
    /// Write counter used for conditional updates
    pub version: i64,
    /// When the row was last written
    pub last_updated: DateTimeUtc,
}

/// `AuctionState` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

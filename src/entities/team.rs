//! Team entity - A franchise bidding in the auction.
//!
//! `current_balance` and `players_count` are derived from the team's auction results and are
//! only ever changed by the ledger operations in `core::ledger`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Team database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "teams")]
pub struct Model {
    /// Unique identifier for the team
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique across teams
    #[sea_orm(unique)]
    pub name: String,
    /// Logo reference (URL or asset path)
    pub logo_url: String,
    /// Budget the team started the auction with
    pub base_budget: i64,
    /// Remaining spendable budget
    pub current_balance: i64,
    /// Number of players bought
    pub players_count: i32,
    /// When the team was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Team and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One team has many auction results
    #[sea_orm(has_many = "super::auction_result::Entity")]
    AuctionResults,
}

impl Related<super::auction_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuctionResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

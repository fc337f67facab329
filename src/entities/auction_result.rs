//! Auction result entity - One completed sale of a player to a team.
//!
//! A player has at most one result (`player_id` is unique) and every result has its own
//! `auction_order` sequence number.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Auction result database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auction_results")]
pub struct Model {
    /// Unique identifier for the sale
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The player that was sold
    #[sea_orm(unique)]
    pub player_id: i64,
    /// The team that bought the player
    pub team_id: i64,
    /// Agreed sale price
    pub final_amount: i64,
    /// Chronological sale number
    #[sea_orm(unique)]
    pub auction_order: i32,
    /// When the sale was recorded
    pub sold_at: DateTimeUtc,
}

/// Defines relationships between `AuctionResult` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each result belongs to one player
    #[sea_orm(
        belongs_to = "super::player::Entity",
        from = "Column::PlayerId",
        to = "super::player::Column::Id"
    )]
    Player,
    /// Each result belongs to one team
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id"
    )]
    Team,
}

impl Related<super::player::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Player.def()
    }
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

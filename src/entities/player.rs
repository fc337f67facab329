//! Player entity - A cricketer offered in the auction.
//!
//! `status` is `sold` exactly when an auction result references the player. `bidding` is only
//! written when the auction runs with persisted bidding status (see `config::settings`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Auction status of a player
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// Waiting in the queue, or passed over
    #[sea_orm(string_value = "unsold")]
    Unsold,
    /// Currently on the block
    #[sea_orm(string_value = "bidding")]
    Bidding,
    /// Bought by a team
    #[sea_orm(string_value = "sold")]
    Sold,
}

impl PlayerStatus {
    /// Lowercase name as stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unsold => "unsold",
            Self::Bidding => "bidding",
            Self::Sold => "sold",
        }
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playing role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PlayerCategory {
    /// Specialist batter
    #[sea_orm(string_value = "Batsman")]
    Batsman,
    /// Specialist bowler
    #[sea_orm(string_value = "Bowler")]
    Bowler,
    /// Bats and bowls
    #[sea_orm(string_value = "All Rounder")]
    #[serde(rename = "All Rounder")]
    AllRounder,
}

impl PlayerCategory {
    /// Display label, matching the stored value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Batsman => "Batsman",
            Self::Bowler => "Bowler",
            Self::AllRounder => "All Rounder",
        }
    }

    /// Parses a free-text role, ignoring case and separators.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "batsman" | "batter" => Some(Self::Batsman),
            "bowler" => Some(Self::Bowler),
            "allrounder" => Some(Self::AllRounder),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regular or marquee player
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PlayerType {
    /// Regular pool player
    #[default]
    #[sea_orm(string_value = "Regular")]
    Regular,
    /// Marquee player
    #[sea_orm(string_value = "ICON")]
    #[serde(rename = "ICON")]
    Icon,
}

impl PlayerType {
    /// Label as stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "Regular",
            Self::Icon => "ICON",
        }
    }

    /// Parses `Regular` / `ICON`, ignoring case
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regular" | "" => Some(Self::Regular),
            "icon" => Some(Self::Icon),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "players")]
pub struct Model {
    /// Unique identifier for the player
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Player name
    pub name: String,
    /// Age as entered (free text)
    pub age: String,
    /// Playing role
    pub category: PlayerCategory,
    /// Phone number, digits only; natural key for imports
    #[sea_orm(unique)]
    pub phone: String,
    /// Photo reference (URL or asset path)
    pub photo_url: String,
    /// Regular or ICON
    pub player_type: PlayerType,
    /// Minimum starting bid
    pub base_price: i64,
    /// Auction status
    pub status: PlayerStatus,
    /// Sale sequence number while sold
    pub auction_order: Option<i32>,
    /// Operator-assigned display number for queue lookup
    pub auction_serial_number: Option<i32>,
    /// Whether the registration was verified
    pub is_valid_player: bool,
    /// Jersey number, if assigned
    pub jersey_number: Option<i32>,
    /// Name printed on the jersey
    pub jersey_name: Option<String>,
    /// When the player was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Player and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A player has at most one auction result
    #[sea_orm(has_one = "super::auction_result::Entity")]
    AuctionResult,
}

impl Related<super::auction_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuctionResult.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!(PlayerCategory::parse("All Rounder"), Some(PlayerCategory::AllRounder));
        assert_eq!(PlayerCategory::parse("all-rounder"), Some(PlayerCategory::AllRounder));
        assert_eq!(PlayerCategory::parse("BATSMAN"), Some(PlayerCategory::Batsman));
        assert_eq!(PlayerCategory::parse("keeper"), None);
    }

    #[test]
    fn test_parse_player_type() {
        assert_eq!(PlayerType::parse("ICON"), Some(PlayerType::Icon));
        assert_eq!(PlayerType::parse(""), Some(PlayerType::Regular));
        assert_eq!(PlayerType::parse("Premium"), None);
    }
}

//! Read models for the spectator display and the management console.
//!
//! Everything here is computed from the store on each call; views re-run these queries whenever
//! the change feed says a table moved.

use crate::{
    core::{auction, team as teams},
    entities::{
        AuctionResult, Player, Team, auction_result, auction_state, player, team,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::HashMap;

/// Everything the live display shows.
#[derive(Debug, Clone)]
pub struct AuctionBoard {
    /// Current auction state
    pub state: auction_state::Model,
    /// Phase derived from the state
    pub phase: auction::AuctionPhase,
    /// Player on the block or on display
    pub current_player: Option<player::Model>,
    /// The sale of the current player, if it has been sold
    pub current_sale: Option<SaleRecord>,
    /// All teams ordered by name
    pub teams: Vec<team::Model>,
}

impl AuctionBoard {
    /// Whether the displayed player has already been sold.
    #[must_use]
    pub const fn is_current_player_sold(&self) -> bool {
        self.current_sale.is_some()
    }
}

/// Spending summary for one team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStanding {
    /// The team
    pub team: team::Model,
    /// Total paid for bought players
    pub spent: i64,
    /// Remaining balance
    pub remaining: i64,
    /// Players bought
    pub players_count: i32,
}

/// A player bought by a team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// The player
    pub player: player::Model,
    /// Price paid
    pub amount: i64,
    /// Sale sequence number
    pub auction_order: i32,
}

/// An auction result joined with its player and team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRecord {
    /// The stored result
    pub result: auction_result::Model,
    /// The player sold, if still present
    pub player: Option<player::Model>,
    /// The buying team, if still present
    pub team: Option<team::Model>,
}

impl SaleRecord {
    /// Player name, or a marker when the row is gone.
    #[must_use]
    pub fn player_name(&self) -> &str {
        self.player.as_ref().map_or("Unknown player", |p| p.name.as_str())
    }

    /// Team name, or a marker when the row is gone.
    #[must_use]
    pub fn team_name(&self) -> &str {
        self.team.as_ref().map_or("Unknown team", |t| t.name.as_str())
    }
}

/// Builds the live display.
pub async fn auction_board(db: &DatabaseConnection) -> Result<AuctionBoard> {
    let state = auction::get_auction_state(db).await?;
    let current_player = match state.current_player_id {
        Some(id) => Player::find_by_id(id).one(db).await?,
        None => None,
    };
    let current_sale = match &current_player {
        Some(p) => {
            let result = AuctionResult::find()
                .filter(auction_result::Column::PlayerId.eq(p.id))
                .one(db)
                .await?;
            match result {
                Some(result) => {
                    let team = Team::find_by_id(result.team_id).one(db).await?;
                    Some(SaleRecord {
                        result,
                        player: Some(p.clone()),
                        team,
                    })
                }
                None => None,
            }
        }
        None => None,
    };

    Ok(AuctionBoard {
        phase: auction::phase(&state),
        state,
        current_player,
        current_sale,
        teams: teams::list_teams(db).await?,
    })
}

/// Spent, remaining and player count for every team, ordered by name.
pub async fn team_standings(db: &DatabaseConnection) -> Result<Vec<TeamStanding>> {
    Ok(teams::list_teams(db)
        .await?
        .into_iter()
        .map(|team| TeamStanding {
            spent: team.base_budget - team.current_balance,
            remaining: team.current_balance,
            players_count: team.players_count,
            team,
        })
        .collect())
}

/// Players bought by a team, in auction order.
pub async fn team_roster(db: &DatabaseConnection, team_id: i64) -> Result<Vec<RosterEntry>> {
    if teams::get_team(db, team_id).await?.is_none() {
        return Err(Error::TeamNotFound {
            id: team_id.to_string(),
        });
    }

    let sales = AuctionResult::find()
        .filter(auction_result::Column::TeamId.eq(team_id))
        .order_by_asc(auction_result::Column::AuctionOrder)
        .find_also_related(Player)
        .all(db)
        .await?;

    Ok(sales
        .into_iter()
        .filter_map(|(result, player)| {
            player.map(|player| RosterEntry {
                player,
                amount: result.final_amount,
                auction_order: result.auction_order,
            })
        })
        .collect())
}

/// Every sale with its player and team, in auction order.
pub async fn list_transactions(db: &DatabaseConnection) -> Result<Vec<SaleRecord>> {
    let sales = AuctionResult::find()
        .order_by_asc(auction_result::Column::AuctionOrder)
        .find_also_related(Player)
        .all(db)
        .await?;
    let teams: HashMap<i64, team::Model> = Team::find()
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    Ok(sales
        .into_iter()
        .map(|(result, player)| SaleRecord {
            team: teams.get(&result.team_id).cloned(),
            player,
            result,
        })
        .collect())
}

/// Formats rupees with Indian digit grouping, e.g. `₹1,00,000`.
#[must_use]
pub fn format_currency(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (left, right) = rest.split_at(rest.len() - 2);
            parts.push(right);
            rest = left;
        }
        parts.push(rest);
        parts.reverse();
        format!("{},{tail}", parts.join(","))
    };
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}₹{grouped}")
}

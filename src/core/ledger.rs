//! Balance ledger - Selling players and correcting sales.
//!
//! A sale touches three rows: the auction result, the buying team and the player. Every
//! operation here applies all of its effects inside one database transaction, using conditional
//! updates (`balance = balance - x WHERE balance >= x`, `status = 'sold' WHERE status <> 'sold'`)
//! so concurrent consoles cannot double-sell a player or overdraw a team. Edits reuse the same
//! reverse/apply pair as delete and sell, so the balance arithmetic has exactly one code path.
//!
//! The invariants kept for every team are
//! `current_balance = base_budget - sum(final_amount)` and `players_count = count(results)`.

use crate::{
    config::settings::AuctionSettings,
    core::{
        auction,
        events::{ChangeFeed, Table},
    },
    entities::{
        AuctionResult, Player, Team, auction_result, auction_state,
        player::{self, PlayerStatus},
        team,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::{
    collections::{HashMap, HashSet},
    fmt,
};
use tracing::{debug, info, warn};

const SALE_TABLES: [Table; 3] = [Table::AuctionResults, Table::Teams, Table::Players];
/// Retries of [`sell_at_next_order`] when the chosen order is taken, and of [`mark_unsold`] when
/// the auction state moves on underneath it.
const MAX_ORDER_ATTEMPTS: u32 = 3;

/// The next free auction order number (1 for the first sale).
pub async fn next_auction_order<C>(db: &C) -> Result<i32>
where
    C: ConnectionTrait,
{
    let max_order: Option<i32> = AuctionResult::find()
        .select_only()
        .column_as(auction_result::Column::AuctionOrder.max(), "max_order")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    Ok(max_order.unwrap_or(0) + 1)
}

/// Sells a player to a team.
///
/// Rejects, in order: a non-positive amount, a bid below the player's base price, an unknown team
/// or a bid above its balance, and a player that is already sold. On success the result row is
/// inserted, the team is debited and gains a player, and the player is marked sold, all in one
/// commit. If the player is on the block, bidding closes but the player stays displayed.
pub async fn sell_player(
    db: &DatabaseConnection,
    player_id: i64,
    team_id: i64,
    amount: i64,
    auction_order: i32,
    feed: &ChangeFeed,
) -> Result<auction_result::Model> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    let player = find_player(&txn, player_id).await?;
    if amount < player.base_price {
        warn!(player_id, amount, base_price = player.base_price, "Bid below base price");
        return Err(Error::BelowBasePrice {
            amount,
            base_price: player.base_price,
        });
    }

    let team = find_team(&txn, team_id).await?;
    if amount > team.current_balance {
        warn!(team_id, amount, balance = team.current_balance, "Bid exceeds team balance");
        return Err(Error::InsufficientBalance {
            available: team.current_balance,
            required: amount,
        });
    }

    if player.status == PlayerStatus::Sold || result_for_player(&txn, player_id).await?.is_some() {
        return Err(Error::AlreadySold { player_id });
    }

    let result = apply_sale(&txn, player_id, team_id, amount, auction_order, Utc::now()).await?;
    let closed_state = if auction::close_bidding_for(&txn, player_id).await? {
        Some(auction::get_auction_state(&txn).await?)
    } else {
        None
    };
    txn.commit().await?;

    info!(
        transaction_id = result.id,
        player_id,
        team_id,
        amount,
        auction_order,
        "Player sold"
    );
    feed.publish_all(&SALE_TABLES);
    if let Some(state) = closed_state {
        feed.publish_state(&state);
    }
    Ok(result)
}

/// Sells a player at the next free auction order, retrying if another console took that number
/// first.
pub async fn sell_at_next_order(
    db: &DatabaseConnection,
    player_id: i64,
    team_id: i64,
    amount: i64,
    feed: &ChangeFeed,
) -> Result<auction_result::Model> {
    let mut attempts = 0;
    loop {
        let order = next_auction_order(db).await?;
        match sell_player(db, player_id, team_id, amount, order, feed).await {
            Err(Error::DuplicateAuctionOrder { order }) if attempts < MAX_ORDER_ATTEMPTS => {
                debug!(order, "Auction order taken, retrying with the next one");
                attempts += 1;
            }
            other => return other,
        }
    }
}

/// Deletes a sale and reverses it: the team is refunded and loses a player, and the player goes
/// back to unsold with no auction order. Returns the deleted row.
pub async fn delete_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
    feed: &ChangeFeed,
) -> Result<auction_result::Model> {
    let txn = db.begin().await?;
    let result = find_result(&txn, transaction_id).await?;
    reverse_sale(&txn, &result).await?;
    txn.commit().await?;

    info!(
        transaction_id,
        player_id = result.player_id,
        team_id = result.team_id,
        amount = result.final_amount,
        "Transaction deleted"
    );
    feed.publish_all(&SALE_TABLES);
    Ok(result)
}

/// Corrects a sale's team and amount.
///
/// The available balance of the target team includes the refund of the old amount when the team
/// is unchanged. The old sale is reversed and the corrected one applied in the same commit, keeping
/// the player, auction order and sale time; no other console can observe or take the vacated
/// player in between.
pub async fn edit_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
    new_team_id: i64,
    new_amount: i64,
    min_bid: i64,
    feed: &ChangeFeed,
) -> Result<auction_result::Model> {
    if new_amount < min_bid || new_amount <= 0 {
        return Err(Error::BelowMinimumBid {
            amount: new_amount,
            minimum: min_bid,
        });
    }

    let txn = db.begin().await?;
    let original = find_result(&txn, transaction_id).await?;
    let team = find_team(&txn, new_team_id).await?;

    let available = available_balance(&team, &original);
    if new_amount > available {
        warn!(transaction_id, new_team_id, new_amount, available, "Edit exceeds team balance");
        return Err(Error::InsufficientBalance {
            available,
            required: new_amount,
        });
    }

    reverse_sale(&txn, &original).await?;
    let corrected = apply_sale(
        &txn,
        original.player_id,
        new_team_id,
        new_amount,
        original.auction_order,
        original.sold_at,
    )
    .await?;
    txn.commit().await?;

    info!(
        old_transaction_id = transaction_id,
        transaction_id = corrected.id,
        player_id = corrected.player_id,
        old_team_id = original.team_id,
        new_team_id,
        old_amount = original.final_amount,
        new_amount,
        "Transaction corrected"
    );
    feed.publish_all(&SALE_TABLES);
    Ok(corrected)
}

/// Marks a player as passed over and moves the auction on to the next unsold player.
///
/// Refused with [`Error::AlreadySold`] if the player has a sale. Team balances are untouched. The
/// status change and the advance commit together.
pub async fn mark_unsold(
    db: &DatabaseConnection,
    settings: &AuctionSettings,
    player_id: i64,
    feed: &ChangeFeed,
) -> Result<auction_state::Model> {
    for _ in 0..MAX_ORDER_ATTEMPTS {
        let txn = db.begin().await?;
        find_player(&txn, player_id).await?;
        if result_for_player(&txn, player_id).await?.is_some() {
            return Err(Error::AlreadySold { player_id });
        }

        let changed = Player::update_many()
            .col_expr(player::Column::Status, Expr::value(PlayerStatus::Unsold))
            .col_expr(player::Column::AuctionOrder, Expr::value(Option::<i32>::None))
            .filter(player::Column::Id.eq(player_id))
            .filter(player::Column::Status.ne(PlayerStatus::Sold))
            .exec(&txn)
            .await?;
        if changed.rows_affected == 0 {
            return Err(Error::AlreadySold { player_id });
        }

        let Some(state) = auction::advance_within(&txn, settings).await? else {
            debug!(player_id, "Auction state moved on, retrying unsold mark");
            continue;
        };
        txn.commit().await?;

        info!(player_id, "Player marked unsold");
        feed.publish(Table::Players);
        auction::publish_selection(feed, settings, &state);
        return Ok(state);
    }

    Err(Error::StateConflict {
        attempts: MAX_ORDER_ATTEMPTS,
    })
}

/// Spendable balance of `team` if `original` were re-assigned to it.
#[must_use]
pub const fn available_balance(team: &team::Model, original: &auction_result::Model) -> i64 {
    if team.id == original.team_id {
        team.current_balance + original.final_amount
    } else {
        team.current_balance
    }
}

/// Records a sale: flips the player to sold, inserts the result and debits the team.
/// Any refusal leaves the surrounding transaction to roll back.
async fn apply_sale(
    txn: &DatabaseTransaction,
    player_id: i64,
    team_id: i64,
    amount: i64,
    auction_order: i32,
    sold_at: DateTime<Utc>,
) -> Result<auction_result::Model> {
    let flipped = Player::update_many()
        .col_expr(player::Column::Status, Expr::value(PlayerStatus::Sold))
        .col_expr(player::Column::AuctionOrder, Expr::value(Some(auction_order)))
        .filter(player::Column::Id.eq(player_id))
        .filter(player::Column::Status.ne(PlayerStatus::Sold))
        .exec(txn)
        .await?;
    if flipped.rows_affected == 0 {
        return Err(Error::AlreadySold { player_id });
    }

    let result = auction_result::ActiveModel {
        player_id: Set(player_id),
        team_id: Set(team_id),
        final_amount: Set(amount),
        auction_order: Set(auction_order),
        sold_at: Set(sold_at),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|e| match result_conflict(&e) {
        Some(Conflict::Player) => Error::AlreadySold { player_id },
        Some(Conflict::Order) => Error::DuplicateAuctionOrder {
            order: auction_order,
        },
        None => Error::Database(e),
    })?;

    let debited = Team::update_many()
        .col_expr(
            team::Column::CurrentBalance,
            Expr::col(team::Column::CurrentBalance).sub(amount),
        )
        .col_expr(
            team::Column::PlayersCount,
            Expr::col(team::Column::PlayersCount).add(1),
        )
        .filter(team::Column::Id.eq(team_id))
        .filter(team::Column::CurrentBalance.gte(amount))
        .exec(txn)
        .await?;
    if debited.rows_affected == 0 {
        let team = find_team(txn, team_id).await?;
        return Err(Error::InsufficientBalance {
            available: team.current_balance,
            required: amount,
        });
    }

    Ok(result)
}

/// Removes a sale: deletes the result, refunds the team and returns the player to unsold.
async fn reverse_sale(txn: &DatabaseTransaction, result: &auction_result::Model) -> Result<()> {
    let deleted = AuctionResult::delete_many()
        .filter(auction_result::Column::Id.eq(result.id))
        .exec(txn)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(Error::TransactionNotFound { id: result.id });
    }

    Team::update_many()
        .col_expr(
            team::Column::CurrentBalance,
            Expr::col(team::Column::CurrentBalance).add(result.final_amount),
        )
        .col_expr(
            team::Column::PlayersCount,
            Expr::col(team::Column::PlayersCount).sub(1),
        )
        .filter(team::Column::Id.eq(result.team_id))
        .exec(txn)
        .await?;

    Player::update_many()
        .col_expr(player::Column::Status, Expr::value(PlayerStatus::Unsold))
        .col_expr(player::Column::AuctionOrder, Expr::value(Option::<i32>::None))
        .filter(player::Column::Id.eq(result.player_id))
        .exec(txn)
        .await?;

    Ok(())
}

enum Conflict {
    Player,
    Order,
}

fn result_conflict(err: &DbErr) -> Option<Conflict> {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(message)) => {
            if message.contains("auction_order") {
                Some(Conflict::Order)
            } else {
                Some(Conflict::Player)
            }
        }
        _ => None,
    }
}

async fn find_player<C: ConnectionTrait>(db: &C, player_id: i64) -> Result<player::Model> {
    Player::find_by_id(player_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::PlayerNotFound {
            id: player_id.to_string(),
        })
}

async fn find_team<C: ConnectionTrait>(db: &C, team_id: i64) -> Result<team::Model> {
    Team::find_by_id(team_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::TeamNotFound {
            id: team_id.to_string(),
        })
}

async fn find_result<C: ConnectionTrait>(
    db: &C,
    transaction_id: i64,
) -> Result<auction_result::Model> {
    AuctionResult::find_by_id(transaction_id)
        .one(db)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })
}

async fn result_for_player<C: ConnectionTrait>(
    db: &C,
    player_id: i64,
) -> Result<Option<auction_result::Model>> {
    AuctionResult::find()
        .filter(auction_result::Column::PlayerId.eq(player_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Looks up a sale by id.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<auction_result::Model>> {
    AuctionResult::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All sales in auction order.
pub async fn get_transactions(db: &DatabaseConnection) -> Result<Vec<auction_result::Model>> {
    AuctionResult::find()
        .order_by_asc(auction_result::Column::AuctionOrder)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A broken ledger invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// Team balance does not equal budget minus spend
    TeamBalance {
        /// Team id
        team_id: i64,
        /// Balance implied by the results
        expected: i64,
        /// Stored balance
        actual: i64,
    },
    /// Team player count does not equal its number of results
    TeamPlayerCount {
        /// Team id
        team_id: i64,
        /// Count implied by the results
        expected: i32,
        /// Stored count
        actual: i32,
    },
    /// Player status disagrees with whether a result exists
    PlayerStatus {
        /// Player id
        player_id: i64,
        /// Whether a result references the player
        has_result: bool,
        /// Stored status
        actual: PlayerStatus,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TeamBalance {
                team_id,
                expected,
                actual,
            } => write!(f, "team {team_id}: balance {actual}, expected {expected}"),
            Self::TeamPlayerCount {
                team_id,
                expected,
                actual,
            } => write!(f, "team {team_id}: {actual} players, expected {expected}"),
            Self::PlayerStatus {
                player_id,
                has_result,
                actual,
            } => {
                let sale = if *has_result { "has a sale" } else { "has no sale" };
                write!(f, "player {player_id}: status {actual} but {sale}")
            }
        }
    }
}

/// Recomputes every ledger invariant from the results table and reports what disagrees.
pub async fn audit_ledger(db: &DatabaseConnection) -> Result<Vec<Discrepancy>> {
    let results = AuctionResult::find().all(db).await?;
    let teams = Team::find().order_by_asc(team::Column::Id).all(db).await?;
    let players = Player::find().order_by_asc(player::Column::Id).all(db).await?;

    let mut spend: HashMap<i64, (i64, i32)> = HashMap::new();
    for result in &results {
        let entry = spend.entry(result.team_id).or_default();
        entry.0 += result.final_amount;
        entry.1 += 1;
    }
    let sold: HashSet<i64> = results.iter().map(|r| r.player_id).collect();

    let mut discrepancies = Vec::new();
    for team in &teams {
        let (spent, count) = spend.get(&team.id).copied().unwrap_or_default();
        let expected = team.base_budget - spent;
        if team.current_balance != expected {
            discrepancies.push(Discrepancy::TeamBalance {
                team_id: team.id,
                expected,
                actual: team.current_balance,
            });
        }
        if team.players_count != count {
            discrepancies.push(Discrepancy::TeamPlayerCount {
                team_id: team.id,
                expected: count,
                actual: team.players_count,
            });
        }
    }
    for player in &players {
        let has_result = sold.contains(&player.id);
        if has_result != (player.status == PlayerStatus::Sold) {
            discrepancies.push(Discrepancy::PlayerStatus {
                player_id: player.id,
                has_result,
                actual: player.status,
            });
        }
    }

    if !discrepancies.is_empty() {
        warn!(count = discrepancies.len(), "Ledger audit found discrepancies");
    }
    Ok(discrepancies)
}

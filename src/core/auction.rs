//! Auction state machine.
//!
//! The live auction is a single versioned row. Every transition is operator initiated and applied
//! as a compare-and-swap on `version`, retried a few times if another console wrote first:
//!
//! - idle (auction inactive)
//! - active, awaiting a player
//! - active, bidding open on player P
//! - active, P sold and still displayed with bidding closed
//!
//! Only unsold players can be put on the block. With [`BiddingStatusMode::Persisted`] the player on
//! the block is also marked `bidding` in the players table.

use crate::{
    config::settings::{AuctionSettings, BiddingStatusMode},
    core::events::{ChangeFeed, Table},
    core::player,
    entities::{
        AuctionState, Player, auction_state,
        player::{Model as PlayerModel, PlayerStatus},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// Primary key of the singleton state row.
pub const STATE_ROW_ID: i32 = 1;
/// Compare-and-swap attempts before giving up with [`Error::StateConflict`].
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Where the auction currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionPhase {
    /// The auction is not running
    Idle,
    /// Running, with nobody on the block
    AwaitingPlayer,
    /// Taking bids for a player
    Bidding {
        /// Player on the block
        player_id: i64,
    },
    /// A player is still displayed but bidding has closed
    Closed {
        /// Player on display
        player_id: i64,
    },
}

/// Derives the phase from a state row.
#[must_use]
pub const fn phase(state: &auction_state::Model) -> AuctionPhase {
    if !state.is_auction_active {
        return AuctionPhase::Idle;
    }
    match (state.current_player_id, state.is_bidding_open) {
        (Some(player_id), true) => AuctionPhase::Bidding { player_id },
        (Some(player_id), false) => AuctionPhase::Closed { player_id },
        (None, _) => AuctionPhase::AwaitingPlayer,
    }
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Activate(bool),
    Select(Option<i64>),
}

/// Reads the auction state, creating the row on first use.
pub async fn get_auction_state<C>(db: &C) -> Result<auction_state::Model>
where
    C: ConnectionTrait,
{
    if let Some(state) = AuctionState::find_by_id(STATE_ROW_ID).one(db).await? {
        return Ok(state);
    }

    let initial = auction_state::ActiveModel {
        id: Set(STATE_ROW_ID),
        current_player_id: Set(None),
        is_auction_active: Set(false),
        is_bidding_open: Set(false),
        version: Set(0),
        last_updated: Set(Utc::now()),
    };
    match initial.insert(db).await {
        Ok(state) => Ok(state),
        // Another console created it first
        Err(e) if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
            AuctionState::find_by_id(STATE_ROW_ID)
                .one(db)
                .await?
                .ok_or(Error::StateConflict { attempts: 1 })
        }
        Err(e) => Err(e.into()),
    }
}

async fn compare_and_swap<C>(
    db: &C,
    current: &auction_state::Model,
    transition: Transition,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let update = AuctionState::update_many()
        .col_expr(
            auction_state::Column::Version,
            Expr::col(auction_state::Column::Version).add(1),
        )
        .col_expr(auction_state::Column::LastUpdated, Expr::value(Utc::now()));

    let update = match transition {
        Transition::Activate(active) => {
            update.col_expr(auction_state::Column::IsAuctionActive, Expr::value(active))
        }
        Transition::Select(player_id) => update
            .col_expr(auction_state::Column::CurrentPlayerId, Expr::value(player_id))
            .col_expr(
                auction_state::Column::IsBiddingOpen,
                Expr::value(player_id.is_some()),
            ),
    };

    let result = update
        .filter(auction_state::Column::Id.eq(STATE_ROW_ID))
        .filter(auction_state::Column::Version.eq(current.version))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Starts or stops the auction. The current player is left untouched.
pub async fn set_auction_active(
    db: &DatabaseConnection,
    active: bool,
    feed: &ChangeFeed,
) -> Result<auction_state::Model> {
    for _ in 0..MAX_CAS_ATTEMPTS {
        let txn = db.begin().await?;
        let state = get_auction_state(&txn).await?;
        if state.is_auction_active == active {
            txn.commit().await?;
            return Ok(state);
        }
        if !compare_and_swap(&txn, &state, Transition::Activate(active)).await? {
            continue;
        }
        let updated = get_auction_state(&txn).await?;
        txn.commit().await?;

        info!(active, version = updated.version, "Auction activity changed");
        feed.publish_state(&updated);
        return Ok(updated);
    }
    Err(Error::StateConflict {
        attempts: MAX_CAS_ATTEMPTS,
    })
}

/// Marks the auction as running.
pub async fn start_auction(
    db: &DatabaseConnection,
    feed: &ChangeFeed,
) -> Result<auction_state::Model> {
    set_auction_active(db, true, feed).await
}

/// Marks the auction as stopped.
pub async fn stop_auction(
    db: &DatabaseConnection,
    feed: &ChangeFeed,
) -> Result<auction_state::Model> {
    set_auction_active(db, false, feed).await
}

/// Puts a player on the block, or clears the block with `None`.
///
/// Bidding opens exactly when a player is selected. The player must be unsold; re-selecting the
/// player already on the block is allowed.
pub async fn set_next_player(
    db: &DatabaseConnection,
    settings: &AuctionSettings,
    player_id: Option<i64>,
    feed: &ChangeFeed,
) -> Result<auction_state::Model> {
    for _ in 0..MAX_CAS_ATTEMPTS {
        let txn = db.begin().await?;
        let state = get_auction_state(&txn).await?;
        // A missed swap drops the transaction, rolling back any status changes
        if let Some(updated) = select_player(&txn, settings, &state, player_id).await? {
            txn.commit().await?;
            publish_selection(feed, settings, &updated);
            return Ok(updated);
        }
    }

    Err(Error::StateConflict {
        attempts: MAX_CAS_ATTEMPTS,
    })
}

/// Moves on to the next unsold player after the one on the block, or clears the block when the
/// queue is exhausted.
pub async fn advance_to_next_player(
    db: &DatabaseConnection,
    settings: &AuctionSettings,
    feed: &ChangeFeed,
) -> Result<auction_state::Model> {
    for _ in 0..MAX_CAS_ATTEMPTS {
        let txn = db.begin().await?;
        if let Some(updated) = advance_within(&txn, settings).await? {
            txn.commit().await?;
            publish_selection(feed, settings, &updated);
            return Ok(updated);
        }
    }

    Err(Error::StateConflict {
        attempts: MAX_CAS_ATTEMPTS,
    })
}

/// One attempt at advancing inside `txn`. `None` means another console wrote first.
pub(crate) async fn advance_within<C>(
    txn: &C,
    settings: &AuctionSettings,
) -> Result<Option<auction_state::Model>>
where
    C: ConnectionTrait,
{
    let state = get_auction_state(txn).await?;
    let next = next_in_queue(txn, state.current_player_id).await?;
    select_player(txn, settings, &state, next.map(|p| p.id)).await
}

/// Validates and swaps in a new selection against `state`, returning the updated row read back
/// inside `txn`. `None` means the version moved on.
async fn select_player<C>(
    txn: &C,
    settings: &AuctionSettings,
    state: &auction_state::Model,
    player_id: Option<i64>,
) -> Result<Option<auction_state::Model>>
where
    C: ConnectionTrait,
{
    if let Some(id) = player_id {
        let candidate = Player::find_by_id(id)
            .one(txn)
            .await?
            .ok_or_else(|| Error::PlayerNotFound { id: id.to_string() })?;
        let on_block = state.current_player_id == Some(id);
        let selectable = candidate.status == PlayerStatus::Unsold
            || (on_block && candidate.status == PlayerStatus::Bidding);
        if !selectable {
            return Err(Error::PlayerNotSelectable {
                player_id: id,
                status: candidate.status,
            });
        }
    }

    if settings.bidding_status == BiddingStatusMode::Persisted {
        if let Some(previous) = state.current_player_id.filter(|p| Some(*p) != player_id) {
            player::set_status_if(txn, previous, PlayerStatus::Bidding, PlayerStatus::Unsold)
                .await?;
        }
        if let Some(id) = player_id {
            player::set_status_if(txn, id, PlayerStatus::Unsold, PlayerStatus::Bidding).await?;
        }
    }

    if !compare_and_swap(txn, state, Transition::Select(player_id)).await? {
        return Ok(None);
    }
    get_auction_state(txn).await.map(Some)
}

/// Logs and announces a committed selection.
pub(crate) fn publish_selection(
    feed: &ChangeFeed,
    settings: &AuctionSettings,
    updated: &auction_state::Model,
) {
    info!(
        player_id = ?updated.current_player_id,
        bidding_open = updated.is_bidding_open,
        version = updated.version,
        "Current player changed"
    );
    feed.publish_state(updated);
    if settings.bidding_status == BiddingStatusMode::Persisted {
        feed.publish(Table::Players);
    }
}

/// Finds the first unsold player queued after `current_player_id`.
///
/// A sold or missing current player restarts from the head of the queue.
pub async fn next_in_queue<C>(
    db: &C,
    current_player_id: Option<i64>,
) -> Result<Option<PlayerModel>>
where
    C: ConnectionTrait,
{
    let queue = player::unsold_queue(db).await?;
    let position = match current_player_id {
        Some(id) => Player::find_by_id(id)
            .one(db)
            .await?
            .filter(|p| p.status != PlayerStatus::Sold)
            .map(|p| (p.name, p.id)),
        None => None,
    };

    Ok(queue.into_iter().find(|candidate| {
        position.as_ref().is_none_or(|(name, id)| {
            (candidate.name.as_str(), candidate.id) > (name.as_str(), *id)
        })
    }))
}

/// Closes bidding if `player_id` is on the block with bidding open. Returns whether the row changed.
pub(crate) async fn close_bidding_for<C>(db: &C, player_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = AuctionState::update_many()
        .col_expr(auction_state::Column::IsBiddingOpen, Expr::value(false))
        .col_expr(
            auction_state::Column::Version,
            Expr::col(auction_state::Column::Version).add(1),
        )
        .col_expr(auction_state::Column::LastUpdated, Expr::value(Utc::now()))
        .filter(auction_state::Column::Id.eq(STATE_ROW_ID))
        .filter(auction_state::Column::CurrentPlayerId.eq(player_id))
        .filter(auction_state::Column::IsBiddingOpen.eq(true))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_state_row_created_lazily() -> Result<()> {
        let db = setup_test_db().await?;
        let state = get_auction_state(&db).await?;
        assert_eq!(state.id, STATE_ROW_ID);
        assert!(!state.is_auction_active);
        assert!(!state.is_bidding_open);
        assert!(state.current_player_id.is_none());
        assert_eq!(phase(&state), AuctionPhase::Idle);

        // Second read returns the same row
        assert_eq!(get_auction_state(&db).await?, state);
        Ok(())
    }

    #[tokio::test]
    async fn test_start_and_stop_leave_current_player_alone() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let player = create_test_player(&db, "Virat", 2000).await?;
        set_next_player(&db, &settings, Some(player.id), &feed).await?;

        let started = start_auction(&db, &feed).await?;
        assert!(started.is_auction_active);
        assert_eq!(started.current_player_id, Some(player.id));
        assert_eq!(phase(&started), AuctionPhase::Bidding { player_id: player.id });

        let stopped = stop_auction(&db, &feed).await?;
        assert!(!stopped.is_auction_active);
        assert_eq!(stopped.current_player_id, Some(player.id));
        assert!(stopped.version > started.version);
        Ok(())
    }

    #[tokio::test]
    async fn test_start_twice_is_a_no_op() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let first = start_auction(&db, &feed).await?;
        let second = start_auction(&db, &feed).await?;
        assert_eq!(first.version, second.version);
        Ok(())
    }

    #[tokio::test]
    async fn test_clearing_player_closes_bidding() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let player = create_test_player(&db, "Rohit", 2000).await?;

        let open = set_next_player(&db, &settings, Some(player.id), &feed).await?;
        assert!(open.is_bidding_open);

        let cleared = set_next_player(&db, &settings, None, &feed).await?;
        assert!(!cleared.is_bidding_open);
        assert!(cleared.current_player_id.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_sold_player_cannot_be_selected() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let player = create_test_player(&db, "Hardik", 2000).await?;
        sell_test_player(&db, player.id, team.id, 5000).await?;

        let result = set_next_player(&db, &settings, Some(player.id), &feed).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::PlayerNotSelectable {
                status: PlayerStatus::Sold,
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_player_cannot_be_selected() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let result = set_next_player(&db, &settings, Some(404), &feed).await;
        assert!(matches!(result.unwrap_err(), Error::PlayerNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_transient_mode_leaves_status_unsold() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let player = create_test_player(&db, "Bumrah", 2000).await?;
        set_next_player(&db, &settings, Some(player.id), &feed).await?;

        let reloaded = player::get_player(&db, player.id).await?.unwrap();
        assert_eq!(reloaded.status, PlayerStatus::Unsold);
        Ok(())
    }

    #[tokio::test]
    async fn test_persisted_mode_tracks_bidding_status() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let settings = persisted_settings();
        let first = create_test_player(&db, "Ashwin", 2000).await?;
        let second = create_test_player(&db, "Jadeja", 2000).await?;

        set_next_player(&db, &settings, Some(first.id), &feed).await?;
        assert_eq!(
            player::get_player(&db, first.id).await?.unwrap().status,
            PlayerStatus::Bidding
        );

        // Re-selecting the player on the block is allowed
        set_next_player(&db, &settings, Some(first.id), &feed).await?;

        set_next_player(&db, &settings, Some(second.id), &feed).await?;
        assert_eq!(
            player::get_player(&db, first.id).await?.unwrap().status,
            PlayerStatus::Unsold
        );
        assert_eq!(
            player::get_player(&db, second.id).await?.unwrap().status,
            PlayerStatus::Bidding
        );

        set_next_player(&db, &settings, None, &feed).await?;
        assert_eq!(
            player::get_player(&db, second.id).await?.unwrap().status,
            PlayerStatus::Unsold
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_advance_walks_queue_then_clears() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let a = create_test_player(&db, "Anil", 2000).await?;
        let b = create_test_player(&db, "Bhuvi", 2000).await?;

        let state = advance_to_next_player(&db, &settings, &feed).await?;
        assert_eq!(state.current_player_id, Some(a.id));

        let state = advance_to_next_player(&db, &settings, &feed).await?;
        assert_eq!(state.current_player_id, Some(b.id));

        let state = advance_to_next_player(&db, &settings, &feed).await?;
        assert!(state.current_player_id.is_none());
        assert!(!state.is_bidding_open);
        Ok(())
    }

    #[tokio::test]
    async fn test_advance_after_sale_restarts_from_queue_head() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let a = create_test_player(&db, "Anil", 2000).await?;
        let b = create_test_player(&db, "Bhuvi", 2000).await?;

        set_next_player(&db, &settings, Some(b.id), &feed).await?;
        sell_test_player(&db, b.id, team.id, 3000).await?;

        let state = advance_to_next_player(&db, &settings, &feed).await?;
        assert_eq!(state.current_player_id, Some(a.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_transitions_publish_versions() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let mut events = feed.subscribe();

        let state = start_auction(&db, &feed).await?;
        let event = events.recv().await.unwrap();
        assert_eq!(event.table, Table::AuctionState);
        assert_eq!(event.version, Some(state.version));
        Ok(())
    }

    #[tokio::test]
    async fn test_selection_returns_and_publishes_committed_row() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let player = create_test_player(&db, "Shami", 2000).await?;
        let mut events = feed.subscribe();

        let selected = set_next_player(&db, &settings, Some(player.id), &feed).await?;
        assert_eq!(get_auction_state(&db).await?, selected);
        assert_eq!(events.recv().await.unwrap().version, Some(selected.version));

        let advanced = advance_to_next_player(&db, &settings, &feed).await?;
        assert_eq!(get_auction_state(&db).await?, advanced);
        assert_eq!(events.recv().await.unwrap().version, Some(advanced.version));
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_version_does_not_apply() -> Result<()> {
        let db = setup_test_db().await?;
        let stale = get_auction_state(&db).await?;
        assert!(compare_and_swap(&db, &stale, Transition::Activate(true)).await?);
        // Same expected version again must miss
        assert!(!compare_and_swap(&db, &stale, Transition::Activate(false)).await?);
        assert!(get_auction_state(&db).await?.is_auction_active);
        Ok(())
    }
}

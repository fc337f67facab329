//! Change notification relay.
//!
//! Mutations publish a [`ChangeEvent`] for every table they touched once their database
//! transaction has committed. Views subscribe and re-read the store on each event; nothing in an
//! event is a source of truth. A polling backstop re-reads the auction state periodically so a
//! write made by another process is still noticed.

use crate::{
    core::auction,
    entities::auction_state,
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Buffered events per subscriber before it starts lagging.
const DEFAULT_CAPACITY: usize = 256;

/// A table whose contents changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// `teams`
    Teams,
    /// `players`
    Players,
    /// `auction_results`
    AuctionResults,
    /// `auction_state`
    AuctionState,
}

/// Notification that a table changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The table that changed
    pub table: Table,
    /// New auction state version, for [`Table::AuctionState`] events
    pub version: Option<i64>,
    /// When the change was published
    pub at: DateTime<Utc>,
}

/// Publish/subscribe hub for change events. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    /// Creates a feed with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a feed buffering `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publishes a change to `table`. Having no subscribers is not an error.
    pub fn publish(&self, table: Table) {
        self.send(ChangeEvent {
            table,
            version: None,
            at: Utc::now(),
        });
    }

    /// Publishes one event per table.
    pub fn publish_all(&self, tables: &[Table]) {
        for table in tables {
            self.publish(*table);
        }
    }

    /// Publishes an auction state change carrying its new version.
    pub fn publish_state(&self, state: &auction_state::Model) {
        self.send(ChangeEvent {
            table: Table::AuctionState,
            version: Some(state.version),
            at: Utc::now(),
        });
    }

    fn send(&self, event: ChangeEvent) {
        // Err only means nobody is listening right now
        if self.sender.send(event).is_err() {
            debug!("Change published with no subscribers");
        }
    }
}

/// Tracks the auction state version last seen by the backstop.
#[derive(Debug)]
pub struct StateBackstop {
    receiver: broadcast::Receiver<ChangeEvent>,
    last_seen: Option<i64>,
}

impl StateBackstop {
    /// Starts watching `feed`.
    #[must_use]
    pub fn new(feed: &ChangeFeed) -> Self {
        Self {
            receiver: feed.subscribe(),
            last_seen: None,
        }
    }

    /// Re-reads the auction state once. Publishes and returns `true` when the stored version differs
    /// from every version already announced on the feed.
    pub async fn tick(&mut self, db: &DatabaseConnection, feed: &ChangeFeed) -> Result<bool> {
        self.drain();
        let state = auction::get_auction_state(db).await?;
        if self.last_seen == Some(state.version) {
            return Ok(false);
        }

        debug!(version = state.version, "Backstop picked up auction state change");
        self.last_seen = Some(state.version);
        feed.publish_state(&state);
        Ok(true)
    }

    fn drain(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(version) = event.version {
                        self.last_seen = Some(self.last_seen.map_or(version, |v| v.max(version)));
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Backstop lagged behind the change feed");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

/// Spawns the polling backstop, ticking every `period` until the runtime shuts down.
pub fn spawn_state_backstop(
    db: DatabaseConnection,
    feed: ChangeFeed,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backstop = StateBackstop::new(&feed);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = backstop.tick(&db, &feed).await {
                warn!("Auction state backstop read failed: {e}");
            }
        }
    })
}

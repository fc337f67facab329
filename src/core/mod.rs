/// Photo and logo uploads with placeholder fallback
pub mod assets;
/// Auction state machine (current player, bidding open)
pub mod auction;
/// Change notifications and the auction state backstop
pub mod events;
/// CSV export of results
pub mod export;
/// Sales, corrections and the ledger audit
pub mod ledger;
/// Player registration, lookups and import
pub mod player;
/// Board, standings and roster read models
pub mod report;
/// Team registration and budgets
pub mod team;

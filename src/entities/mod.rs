//! Entity module - SeaORM entity definitions for the auction tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod auction_result;
pub mod auction_state;
pub mod player;
pub mod team;

// Re-export specific types to avoid conflicts
pub use auction_result::{
    Column as AuctionResultColumn, Entity as AuctionResult, Model as AuctionResultModel,
};
pub use auction_state::{
    Column as AuctionStateColumn, Entity as AuctionState, Model as AuctionStateModel,
};
pub use player::{Column as PlayerColumn, Entity as Player, Model as PlayerModel};
pub use team::{Column as TeamColumn, Entity as Team, Model as TeamModel};

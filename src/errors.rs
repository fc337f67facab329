//! Unified error type for the auction desk.
//!
//! Every failure is scoped to the single operator action that triggered it. [`Error::kind`]
//! sorts variants into the three recoverable classes the console reports differently.

use crate::entities::player::PlayerStatus;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// How an error should be surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape or range, caught before any store call
    Validation,
    /// A business or storage constraint refused the change
    Constraint,
    /// The store or network failed; the operator may retry
    Transient,
}

/// All errors produced by the auction desk.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Input failed validation before reaching the store
    #[error("Invalid input: {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// Amount was zero or negative
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// No team with this id
    #[error("Team not found: {id}")]
    TeamNotFound {
        /// Team id or name that was looked up
        id: String,
    },

    /// No player with this id
    #[error("Player not found: {id}")]
    PlayerNotFound {
        /// Player id, serial or name that was looked up
        id: String,
    },

    /// No auction result with this id
    #[error("Transaction not found: {id}")]
    TransactionNotFound {
        /// Transaction id
        id: i64,
    },

    /// Bid is lower than the player's base price
    #[error("Bid of {amount} is below the base price of {base_price}")]
    BelowBasePrice {
        /// Offered bid
        amount: i64,
        /// The player's base price
        base_price: i64,
    },

    /// Amount is lower than the configured minimum bid
    #[error("Amount of {amount} is below the minimum bid of {minimum}")]
    BelowMinimumBid {
        /// Offered amount
        amount: i64,
        /// Configured floor
        minimum: i64,
    },

    /// The team cannot afford the bid
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance {
        /// Spendable balance at the time of the check
        available: i64,
        /// Amount that was asked for
        required: i64,
    },

    /// Player already has a sale recorded
    #[error("Player {player_id} is already sold")]
    AlreadySold {
        /// Player id
        player_id: i64,
    },

    /// Player cannot be put up for bidding in its current status
    #[error("Player {player_id} cannot be selected while {status}")]
    PlayerNotSelectable {
        /// Player id
        player_id: i64,
        /// Current status
        status: PlayerStatus,
    },

    /// Player details cannot change while the player is sold
    #[error("Player {player_id} is sold; delete the transaction before editing")]
    PlayerLocked {
        /// Player id
        player_id: i64,
    },

    /// Team name already exists
    #[error("A team named '{name}' already exists")]
    DuplicateTeam {
        /// Conflicting name
        name: String,
    },

    /// Player phone number already exists
    #[error("A player with phone {phone} already exists")]
    DuplicatePhone {
        /// Conflicting phone
        phone: String,
    },

    /// Auction order number already used by another sale
    #[error("Auction order {order} is already taken")]
    DuplicateAuctionOrder {
        /// Conflicting order
        order: i32,
    },

    /// The auction state row changed under every retry
    #[error("Auction state kept changing; gave up after {attempts} attempts")]
    StateConflict {
        /// Attempts made
        attempts: u32,
    },

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Environment variable missing or malformed
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Integer did not fit the target column
    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    /// Discord framework failure
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Classifies this error for the operator console.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. }
            | Self::Validation { .. }
            | Self::InvalidAmount { .. }
            | Self::BelowBasePrice { .. }
            | Self::BelowMinimumBid { .. }
            | Self::Json(_) => ErrorKind::Validation,
            Self::TeamNotFound { .. }
            | Self::PlayerNotFound { .. }
            | Self::TransactionNotFound { .. }
            | Self::InsufficientBalance { .. }
            | Self::AlreadySold { .. }
            | Self::PlayerNotSelectable { .. }
            | Self::PlayerLocked { .. }
            | Self::DuplicateTeam { .. }
            | Self::DuplicatePhone { .. }
            | Self::DuplicateAuctionOrder { .. } => ErrorKind::Constraint,
            Self::Database(_)
            | Self::StateConflict { .. }
            | Self::Io(_)
            | Self::Csv(_)
            | Self::EnvVar(_)
            | Self::IntConversion(_)
            | Self::Framework(_) => ErrorKind::Transient,
        }
    }

    /// Maps a unique-constraint violation onto a domain error, passing anything else through.
    pub(crate) fn on_unique_violation(err: DbErr, conflict: impl FnOnce() -> Self) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => conflict(),
            _ => Self::Database(err),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::BelowBasePrice {
                amount: 1999,
                base_price: 2000
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::InsufficientBalance {
                available: 10,
                required: 11
            }
            .kind(),
            ErrorKind::Constraint
        );
        assert_eq!(Error::AlreadySold { player_id: 1 }.kind(), ErrorKind::Constraint);
        assert_eq!(
            Error::Database(DbErr::Custom("down".to_string())).kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_non_unique_errors_pass_through() {
        let err = Error::on_unique_violation(DbErr::Custom("boom".to_string()), || {
            Error::AlreadySold { player_id: 7 }
        });
        assert!(matches!(err, Error::Database(_)));
    }
}

//! Application settings loaded from `config.toml`.
//!
//! The `[auction]` table tunes the auction rules and asset handling; every field has a default so
//! a partial table is fine. The `[[teams]]` array lists the franchises seeded on start-up.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file used when `AUCTION_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// Default starting budget for a seeded team.
pub const DEFAULT_TEAM_BUDGET: i64 = 100_000;

/// Whether selecting a player writes the `bidding` status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiddingStatusMode {
    /// Status stays `unsold` while on the block; only the auction state names the player
    #[default]
    Transient,
    /// The selected player is marked `bidding` until sold, passed over or replaced
    Persisted,
}

/// Rules and defaults for running the auction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuctionSettings {
    /// Lowest amount a corrected transaction may carry
    pub min_bid: i64,
    /// Base price given to imported players
    pub default_base_price: i64,
    /// Handling of the `bidding` player status
    pub bidding_status: BiddingStatusMode,
    /// Seconds between backstop re-reads of the auction state
    pub poll_interval_secs: u64,
    /// File name prefix for CSV exports
    pub export_prefix: String,
    /// Photo used when a player has none
    pub placeholder_photo: String,
    /// Logo used when a team has none
    pub placeholder_logo: String,
    /// Directory uploaded assets are written to
    pub asset_root: PathBuf,
    /// Public URL prefix for uploaded assets
    pub asset_base_url: String,
}

impl Default for AuctionSettings {
    fn default() -> Self {
        Self {
            min_bid: 2000,
            default_base_price: 2000,
            bidding_status: BiddingStatusMode::Transient,
            poll_interval_secs: 2,
            export_prefix: "auction-results".to_string(),
            placeholder_photo: "/assets/player-template.png".to_string(),
            placeholder_logo: "/assets/team-placeholder.png".to_string(),
            asset_root: PathBuf::from("data/assets"),
            asset_base_url: "/assets".to_string(),
        }
    }
}

impl AuctionSettings {
    /// Backstop polling period, never shorter than one second.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// A team to seed on start-up
#[derive(Debug, Clone, Deserialize)]
pub struct TeamConfig {
    /// Team name
    pub name: String,
    /// Logo reference
    #[serde(default)]
    pub logo: Option<String>,
    /// Starting budget
    #[serde(default = "default_team_budget")]
    pub base_budget: i64,
}

const fn default_team_budget() -> i64 {
    DEFAULT_TEAM_BUDGET
}

/// Structure of the whole config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Auction rules
    #[serde(default)]
    pub auction: AuctionSettings,
    /// Teams to seed
    #[serde(default)]
    pub teams: Vec<TeamConfig>,
}

/// Loads application configuration from a TOML file.
///
/// # Errors
/// Returns [`Error::Config`] if the file cannot be read or is not valid TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    tracing::debug!("Loading configuration from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    parse_config(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

/// Loads configuration from `AUCTION_CONFIG`, or `./config.toml` when unset.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("AUCTION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

fn parse_config(contents: &str) -> std::result::Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [auction]
            min_bid = 5000
            bidding_status = "persisted"
            export_prefix = "bcl-2025"

            [[teams]]
            name = "Bellandur Sharks"
            logo = "/assets/teams/BELLANDUR-SHARKS.jpeg"

            [[teams]]
            name = "RCB"
            base_budget = 150000
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.auction.min_bid, 5000);
        assert_eq!(config.auction.bidding_status, BiddingStatusMode::Persisted);
        assert_eq!(config.auction.export_prefix, "bcl-2025");
        // Unspecified fields fall back to defaults
        assert_eq!(config.auction.default_base_price, 2000);
        assert_eq!(config.auction.poll_interval_secs, 2);

        assert_eq!(config.teams.len(), 2);
        assert_eq!(config.teams[0].base_budget, DEFAULT_TEAM_BUDGET);
        assert_eq!(config.teams[1].base_budget, 150_000);
        assert!(config.teams[1].logo.is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.teams.is_empty());
        assert_eq!(config.auction.bidding_status, BiddingStatusMode::Transient);
        assert_eq!(config.auction.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_config("definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_unknown_bidding_mode_rejected() {
        assert!(parse_config("[auction]\nbidding_status = \"sometimes\"").is_err());
    }
}

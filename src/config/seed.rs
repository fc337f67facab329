//! Start-up seeding of the teams listed in config.toml.
//!
//! Seeding is idempotent by team name: a team that already exists is left exactly as it is, so
//! restarting mid-auction never resets a balance. Bulk player import lives in `core::player`.

use crate::{
    config::settings::TeamConfig,
    core::{events::ChangeFeed, team},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing::{debug, info};

/// Creates every configured team that does not exist yet. Returns how many were created.
pub async fn seed_teams(
    db: &DatabaseConnection,
    teams: &[TeamConfig],
    placeholder_logo: &str,
    feed: &ChangeFeed,
) -> Result<usize> {
    info!(
        "Starting to seed teams. Found {} configurations from TOML.",
        teams.len()
    );

    let mut created = 0;
    for config in teams {
        if team::get_team_by_name(db, &config.name).await?.is_some() {
            debug!(name = %config.name, "Team already present, skipping");
            continue;
        }
        let logo = config
            .logo
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(placeholder_logo);
        team::create_team(db, &config.name, logo, config.base_budget, feed).await?;
        created += 1;
    }

    info!(created, "Finished seeding teams");
    Ok(created)
}

//! Team business logic - registration, editing and lookups.
//!
//! A team starts with `current_balance = base_budget`. Changing the budget later shifts the
//! balance by the same delta so money already spent stays spent.

use crate::{
    core::events::{ChangeFeed, Table},
    entities::{Team, team},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, warn};

fn validate(name: &str, base_budget: i64) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Team name is required"));
    }
    if base_budget < 0 {
        return Err(Error::InvalidAmount {
            amount: base_budget,
        });
    }
    Ok(name.to_string())
}

/// Registers a team with a full balance and no players.
pub async fn create_team(
    db: &DatabaseConnection,
    name: &str,
    logo_url: &str,
    base_budget: i64,
    feed: &ChangeFeed,
) -> Result<team::Model> {
    let name = validate(name, base_budget)?;

    let model = team::ActiveModel {
        name: Set(name.clone()),
        logo_url: Set(logo_url.to_string()),
        base_budget: Set(base_budget),
        current_balance: Set(base_budget),
        players_count: Set(0),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = model
        .insert(db)
        .await
        .map_err(|e| Error::on_unique_violation(e, || Error::DuplicateTeam { name }))?;

    info!(team_id = created.id, name = %created.name, base_budget, "Team created");
    feed.publish(Table::Teams);
    Ok(created)
}

/// Renames a team, replaces its logo and sets a new budget.
///
/// The balance moves by `new_budget - old_budget`. A budget cut deeper than the remaining balance
/// is refused with [`Error::InsufficientBalance`].
pub async fn update_team(
    db: &DatabaseConnection,
    team_id: i64,
    name: &str,
    logo_url: &str,
    base_budget: i64,
    feed: &ChangeFeed,
) -> Result<team::Model> {
    let name = validate(name, base_budget)?;

    let txn = db.begin().await?;
    let current = Team::find_by_id(team_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::TeamNotFound {
            id: team_id.to_string(),
        })?;

    let delta = base_budget - current.base_budget;
    if current.current_balance + delta < 0 {
        return Err(Error::InsufficientBalance {
            available: current.current_balance,
            required: -delta,
        });
    }

    let changed = Team::update_many()
        .col_expr(team::Column::Name, Expr::value(name.clone()))
        .col_expr(team::Column::LogoUrl, Expr::value(logo_url.to_string()))
        .col_expr(team::Column::BaseBudget, Expr::value(base_budget))
        .col_expr(
            team::Column::CurrentBalance,
            Expr::col(team::Column::CurrentBalance).add(delta),
        )
        .filter(team::Column::Id.eq(team_id))
        .filter(team::Column::BaseBudget.eq(current.base_budget))
        .filter(team::Column::CurrentBalance.gte(-delta))
        .exec(&txn)
        .await
        .map_err(|e| Error::on_unique_violation(e, || Error::DuplicateTeam { name }))?;
    if changed.rows_affected == 0 {
        let latest = Team::find_by_id(team_id).one(&txn).await?;
        warn!(team_id, delta, "Budget change no longer fits the balance");
        return Err(Error::InsufficientBalance {
            available: latest.map_or(current.current_balance, |t| t.current_balance),
            required: -delta,
        });
    }

    let updated = Team::find_by_id(team_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::TeamNotFound {
            id: team_id.to_string(),
        })?;
    txn.commit().await?;

    info!(team_id, base_budget, delta, "Team updated");
    feed.publish(Table::Teams);
    Ok(updated)
}

/// Points a team at a new logo. Nothing else changes.
pub async fn set_team_logo(
    db: &DatabaseConnection,
    team_id: i64,
    logo_url: &str,
    feed: &ChangeFeed,
) -> Result<team::Model> {
    let changed = Team::update_many()
        .col_expr(team::Column::LogoUrl, Expr::value(logo_url.to_string()))
        .filter(team::Column::Id.eq(team_id))
        .exec(db)
        .await?;
    let not_found = || Error::TeamNotFound {
        id: team_id.to_string(),
    };
    if changed.rows_affected == 0 {
        return Err(not_found());
    }

    let updated = get_team(db, team_id).await?.ok_or_else(not_found)?;
    info!(team_id, logo_url, "Team logo changed");
    feed.publish(Table::Teams);
    Ok(updated)
}

/// Finds a team by id.
pub async fn get_team(db: &DatabaseConnection, team_id: i64) -> Result<Option<team::Model>> {
    Team::find_by_id(team_id).one(db).await.map_err(Into::into)
}

/// Finds a team by exact name, ignoring surrounding whitespace.
pub async fn get_team_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<team::Model>> {
    Team::find()
        .filter(team::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All teams ordered by name.
pub async fn list_teams(db: &DatabaseConnection) -> Result<Vec<team::Model>> {
    Team::find()
        .order_by_asc(team::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_team_validation() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let feed = ChangeFeed::new();

        let result = create_team(&db, "   ", "", 100_000, &feed).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create_team(&db, "Sharks", "", -1, &feed).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: -1 }));
    }

    #[tokio::test]
    async fn test_create_team_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = ChangeFeed::new();
        let team = create_team(&db, " Sharks ", "/assets/sharks.png", 100_000, &feed).await?;

        assert_eq!(team.name, "Sharks");
        assert_eq!(team.current_balance, 100_000);
        assert_eq!(team.players_count, 0);
        assert_eq!(get_team_by_name(&db, "Sharks").await?.unwrap().id, team.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_team_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = ChangeFeed::new();
        create_team(&db, "Sharks", "", 100_000, &feed).await?;

        let result = create_team(&db, "Sharks", "", 50_000, &feed).await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateTeam { name } if name == "Sharks"));
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_change_shifts_balance() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let player = create_test_player(&db, "A", 2000).await?;
        sell_test_player(&db, player.id, team.id, 30_000).await?;

        let raised = update_team(&db, team.id, "Sharks", "", 120_000, &feed).await?;
        assert_eq!(raised.current_balance, 90_000);

        let cut = update_team(&db, team.id, "Bellandur Sharks", "", 40_000, &feed).await?;
        assert_eq!(cut.name, "Bellandur Sharks");
        assert_eq!(cut.current_balance, 10_000);

        let result = update_team(&db, team.id, "Bellandur Sharks", "", 20_000, &feed).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientBalance {
                available: 10_000,
                required: 20_000
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_budget_cut_racing_a_sale_never_overdraws() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let player = create_test_player(&db, "A", 2000).await?;

        let (cut, sale) = tokio::join!(
            update_team(&db, team.id, "Sharks", "", 50_000, &feed),
            crate::core::ledger::sell_player(&db, player.id, team.id, 60_000, 1, &feed),
        );
        assert_eq!(u8::from(cut.is_ok()) + u8::from(sale.is_ok()), 1);

        let stored = get_team(&db, team.id).await?.unwrap();
        assert!(stored.current_balance >= 0);
        assert!(crate::core::ledger::audit_ledger(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_team_errors() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = ChangeFeed::new();
        create_team(&db, "Sharks", "", 100_000, &feed).await?;
        let other = create_team(&db, "Bulldozers", "", 100_000, &feed).await?;

        let result = update_team(&db, other.id, "Sharks", "", 100_000, &feed).await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateTeam { .. }));

        let result = update_team(&db, 999, "Nobody", "", 100_000, &feed).await;
        assert!(matches!(result.unwrap_err(), Error::TeamNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_team_logo() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;

        let updated = set_team_logo(&db, team.id, "/assets/teams/SHARKS.png", &feed).await?;
        assert_eq!(updated.logo_url, "/assets/teams/SHARKS.png");
        assert_eq!(updated.current_balance, team.current_balance);

        let result = set_team_logo(&db, 999, "/x.png", &feed).await;
        assert!(matches!(result.unwrap_err(), Error::TeamNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_teams_by_name() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = ChangeFeed::new();
        create_team(&db, "Warriors", "", 100_000, &feed).await?;
        create_team(&db, "Bulldozers", "", 100_000, &feed).await?;

        let names: Vec<String> = list_teams(&db).await?.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Bulldozers", "Warriors"]);
        Ok(())
    }
}

//! Player business logic - registration, editing, lookups and bulk import.
//!
//! Status changes caused by a sale live in `core::ledger`; this module never flips a player to or
//! from `sold`. Details of a sold player are frozen until the sale is deleted.

use crate::{
    config::settings::AuctionSettings,
    core::events::{ChangeFeed, Table},
    entities::{
        Player,
        player::{self, PlayerCategory, PlayerStatus, PlayerType},
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Editable player details, used for both registration and updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDetails {
    /// Player name
    pub name: String,
    /// Age as entered
    pub age: String,
    /// Playing role
    pub category: PlayerCategory,
    /// Phone number in any format; stored as digits only
    pub phone: String,
    /// Photo reference
    pub photo_url: String,
    /// Regular or ICON
    pub player_type: PlayerType,
    /// Minimum starting bid
    pub base_price: i64,
    /// Display number for queue lookup
    pub auction_serial_number: Option<i32>,
    /// Whether the registration was verified
    pub is_valid_player: bool,
    /// Jersey number
    pub jersey_number: Option<i32>,
    /// Name printed on the jersey
    pub jersey_name: Option<String>,
}

/// Strips everything but digits from a phone number.
#[must_use]
pub fn sanitize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

fn validate(details: &PlayerDetails) -> Result<(String, String)> {
    let name = details.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Player name is required"));
    }
    let phone = sanitize_phone(&details.phone);
    if phone.is_empty() {
        return Err(Error::validation("Phone number is required"));
    }
    if details.base_price < 0 {
        return Err(Error::InvalidAmount {
            amount: details.base_price,
        });
    }
    if details.auction_serial_number.is_some_and(|n| n < 0) {
        return Err(Error::validation(
            "Auction serial number must be a positive number",
        ));
    }
    if details.jersey_number.is_some_and(|n| n < 0) {
        return Err(Error::validation("Jersey number must be a positive number"));
    }
    Ok((name.to_string(), phone))
}

fn clean_jersey_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string)
}

/// Registers a new, unsold player.
pub async fn create_player(
    db: &DatabaseConnection,
    details: PlayerDetails,
    feed: &ChangeFeed,
) -> Result<player::Model> {
    let (name, phone) = validate(&details)?;

    let model = player::ActiveModel {
        name: Set(name),
        age: Set(details.age.trim().to_string()),
        category: Set(details.category),
        phone: Set(phone.clone()),
        photo_url: Set(details.photo_url),
        player_type: Set(details.player_type),
        base_price: Set(details.base_price),
        status: Set(PlayerStatus::Unsold),
        auction_order: Set(None),
        auction_serial_number: Set(details.auction_serial_number),
        is_valid_player: Set(details.is_valid_player),
        jersey_number: Set(details.jersey_number),
        jersey_name: Set(clean_jersey_name(details.jersey_name.as_deref())),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = model
        .insert(db)
        .await
        .map_err(|e| Error::on_unique_violation(e, || Error::DuplicatePhone { phone }))?;

    info!(player_id = created.id, name = %created.name, "Player registered");
    feed.publish(Table::Players);
    Ok(created)
}

/// Replaces a player's details. Refused while the player is sold.
pub async fn update_player(
    db: &DatabaseConnection,
    player_id: i64,
    details: PlayerDetails,
    feed: &ChangeFeed,
) -> Result<player::Model> {
    let (name, phone) = validate(&details)?;

    let result = Player::update_many()
        .col_expr(player::Column::Name, Expr::value(name))
        .col_expr(player::Column::Age, Expr::value(details.age.trim().to_string()))
        .col_expr(player::Column::Category, Expr::value(details.category))
        .col_expr(player::Column::Phone, Expr::value(phone.clone()))
        .col_expr(player::Column::PhotoUrl, Expr::value(details.photo_url))
        .col_expr(player::Column::PlayerType, Expr::value(details.player_type))
        .col_expr(player::Column::BasePrice, Expr::value(details.base_price))
        .col_expr(
            player::Column::AuctionSerialNumber,
            Expr::value(details.auction_serial_number),
        )
        .col_expr(player::Column::IsValidPlayer, Expr::value(details.is_valid_player))
        .col_expr(player::Column::JerseyNumber, Expr::value(details.jersey_number))
        .col_expr(
            player::Column::JerseyName,
            Expr::value(clean_jersey_name(details.jersey_name.as_deref())),
        )
        .filter(player::Column::Id.eq(player_id))
        .filter(player::Column::Status.ne(PlayerStatus::Sold))
        .exec(db)
        .await
        .map_err(|e| Error::on_unique_violation(e, || Error::DuplicatePhone { phone }))?;

    if result.rows_affected == 0 {
        return match get_player(db, player_id).await? {
            Some(_) => Err(Error::PlayerLocked { player_id }),
            None => Err(Error::PlayerNotFound {
                id: player_id.to_string(),
            }),
        };
    }

    let updated = get_player(db, player_id)
        .await?
        .ok_or_else(|| Error::PlayerNotFound {
            id: player_id.to_string(),
        })?;
    info!(player_id, "Player details updated");
    feed.publish(Table::Players);
    Ok(updated)
}

/// Points a player at a new photo. Refused while the player is sold.
pub async fn set_player_photo(
    db: &DatabaseConnection,
    player_id: i64,
    photo_url: &str,
    feed: &ChangeFeed,
) -> Result<player::Model> {
    let changed = Player::update_many()
        .col_expr(player::Column::PhotoUrl, Expr::value(photo_url.to_string()))
        .filter(player::Column::Id.eq(player_id))
        .filter(player::Column::Status.ne(PlayerStatus::Sold))
        .exec(db)
        .await?;
    let not_found = || Error::PlayerNotFound {
        id: player_id.to_string(),
    };
    if changed.rows_affected == 0 {
        return match get_player(db, player_id).await? {
            Some(_) => Err(Error::PlayerLocked { player_id }),
            None => Err(not_found()),
        };
    }

    let updated = get_player(db, player_id).await?.ok_or_else(not_found)?;
    info!(player_id, photo_url, "Player photo changed");
    feed.publish(Table::Players);
    Ok(updated)
}

/// Finds a player by id.
pub async fn get_player(db: &DatabaseConnection, player_id: i64) -> Result<Option<player::Model>> {
    Player::find_by_id(player_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists players, optionally only those with `status`, ordered by name.
pub async fn list_players<C>(db: &C, status: Option<PlayerStatus>) -> Result<Vec<player::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Player::find();
    if let Some(status) = status {
        query = query.filter(player::Column::Status.eq(status));
    }
    query
        .order_by_asc(player::Column::Name)
        .order_by_asc(player::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The players still waiting to be auctioned, in queue order.
pub async fn unsold_queue<C>(db: &C) -> Result<Vec<player::Model>>
where
    C: ConnectionTrait,
{
    list_players(db, Some(PlayerStatus::Unsold)).await
}

/// Finds a player by the operator-assigned auction serial number.
pub async fn find_player_by_serial(
    db: &DatabaseConnection,
    serial: i32,
) -> Result<Option<player::Model>> {
    Player::find()
        .filter(player::Column::AuctionSerialNumber.eq(serial))
        .order_by_asc(player::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a player who has not been sold by exact name, ignoring surrounding whitespace.
///
/// Names are not unique. Sold players are skipped, and a name shared by more than one remaining
/// player is refused so the operator picks by serial number instead.
pub async fn find_player_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<player::Model>> {
    let name = name.trim();
    let mut matches = Player::find()
        .filter(player::Column::Name.eq(name))
        .filter(player::Column::Status.ne(PlayerStatus::Sold))
        .order_by_asc(player::Column::Id)
        .all(db)
        .await?;
    if matches.len() > 1 {
        return Err(Error::validation(format!(
            "{} players are named '{name}'. Use the auction serial number instead.",
            matches.len()
        )));
    }
    Ok(matches.pop())
}

/// Moves a player from `from` to `to`, doing nothing if the player is not in `from`.
/// Returns whether the row changed.
pub(crate) async fn set_status_if<C>(
    db: &C,
    player_id: i64,
    from: PlayerStatus,
    to: PlayerStatus,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Player::update_many()
        .col_expr(player::Column::Status, Expr::value(to))
        .filter(player::Column::Id.eq(player_id))
        .filter(player::Column::Status.eq(from))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// One record of a player import file.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerRecord {
    /// Player name
    #[serde(rename = "Name", default)]
    pub name: String,
    /// Age as entered
    #[serde(rename = "Age", default)]
    pub age: String,
    /// Playing role
    #[serde(rename = "Category", default)]
    pub category: String,
    /// Phone number in any format
    #[serde(rename = "Ph")]
    pub phone: String,
    /// `Regular` or `ICON`
    #[serde(rename = "PlayerType", default)]
    pub player_type: Option<String>,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// New players created
    pub inserted: usize,
    /// Existing unsold players whose details were refreshed
    pub updated: usize,
    /// Records skipped because they were invalid or the player is sold
    pub skipped: usize,
}

/// Parses an import file: a JSON array of [`PlayerRecord`]s.
pub fn parse_player_records(json: &str) -> Result<Vec<PlayerRecord>> {
    serde_json::from_str(json).map_err(Into::into)
}

/// Reads and imports a JSON player file.
pub async fn import_players_file<P: AsRef<Path>>(
    db: &DatabaseConnection,
    settings: &AuctionSettings,
    path: P,
    feed: &ChangeFeed,
) -> Result<ImportSummary> {
    let contents = tokio::fs::read_to_string(path.as_ref()).await?;
    let records = parse_player_records(&contents)?;
    import_players(db, settings, &records, feed).await
}

/// Upserts players by phone number.
///
/// New players get the default base price and a photo at `players/<phone>.jpg` when that file
/// exists under the asset root, otherwise the placeholder. Existing players keep their status,
/// price and photo; sold players are skipped entirely.
pub async fn import_players(
    db: &DatabaseConnection,
    settings: &AuctionSettings,
    records: &[PlayerRecord],
    feed: &ChangeFeed,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    let quiet = ChangeFeed::with_capacity(1);

    for record in records {
        let phone = sanitize_phone(&record.phone);
        let category = if record.category.trim().is_empty() {
            Some(PlayerCategory::AllRounder)
        } else {
            PlayerCategory::parse(&record.category)
        };
        let player_type = PlayerType::parse(record.player_type.as_deref().unwrap_or_default());
        let (Some(category), Some(player_type)) = (category, player_type) else {
            warn!(phone = %phone, "Skipping import record with unknown category or type");
            summary.skipped += 1;
            continue;
        };
        let name = if record.name.trim().is_empty() {
            "Unknown".to_string()
        } else {
            record.name.trim().to_string()
        };

        let existing = Player::find()
            .filter(player::Column::Phone.eq(phone.as_str()))
            .one(db)
            .await?;

        match existing {
            Some(current) if current.status == PlayerStatus::Sold => {
                summary.skipped += 1;
            }
            Some(current) => {
                let details = PlayerDetails {
                    name,
                    age: record.age.clone(),
                    category,
                    phone,
                    photo_url: current.photo_url.clone(),
                    player_type,
                    base_price: current.base_price,
                    auction_serial_number: current.auction_serial_number,
                    is_valid_player: current.is_valid_player,
                    jersey_number: current.jersey_number,
                    jersey_name: current.jersey_name.clone(),
                };
                update_player(db, current.id, details, &quiet).await?;
                summary.updated += 1;
            }
            None if phone.is_empty() => {
                summary.skipped += 1;
            }
            None => {
                let photo_url = imported_photo_url(settings, &phone).await;
                let details = PlayerDetails {
                    name,
                    age: record.age.clone(),
                    category,
                    phone,
                    photo_url,
                    player_type,
                    base_price: settings.default_base_price,
                    auction_serial_number: None,
                    is_valid_player: true,
                    jersey_number: None,
                    jersey_name: None,
                };
                create_player(db, details, &quiet).await?;
                summary.inserted += 1;
            }
        }
    }

    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped,
        "Player import finished"
    );
    if summary.inserted + summary.updated > 0 {
        feed.publish(Table::Players);
    }
    Ok(summary)
}

async fn imported_photo_url(settings: &AuctionSettings, phone: &str) -> String {
    let relative = format!("players/{phone}.jpg");
    let on_disk = settings.asset_root.join(&relative);
    if tokio::fs::try_exists(&on_disk).await.unwrap_or(false) {
        format!("{}/{relative}", settings.asset_base_url.trim_end_matches('/'))
    } else {
        settings.placeholder_photo.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_sanitize_phone() {
        assert_eq!(sanitize_phone("+91 98450-12345"), "919845012345");
        assert_eq!(sanitize_phone("n/a"), "");
    }

    #[tokio::test]
    async fn test_create_player_validation() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let feed = ChangeFeed::new();

        let mut details = test_player_details("  ", "9845012345", 2000);
        let result = create_player(&db, details.clone(), &feed).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        details.name = "Dhoni".to_string();
        details.phone = "---".to_string();
        let result = create_player(&db, details.clone(), &feed).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        details.phone = "9845012345".to_string();
        details.base_price = -1;
        let result = create_player(&db, details, &feed).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: -1 }));
    }

    #[tokio::test]
    async fn test_create_player_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = ChangeFeed::new();
        let mut details = test_player_details(" Dhoni ", "+91 98450 12345", 2500);
        details.jersey_name = Some("  ".to_string());

        let created = create_player(&db, details, &feed).await?;
        assert_eq!(created.name, "Dhoni");
        assert_eq!(created.phone, "919845012345");
        assert_eq!(created.status, PlayerStatus::Unsold);
        assert_eq!(created.base_price, 2500);
        assert!(created.auction_order.is_none());
        assert!(created.jersey_name.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = ChangeFeed::new();
        create_player(&db, test_player_details("A", "111", 2000), &feed).await?;

        let result = create_player(&db, test_player_details("B", "1-1-1", 2000), &feed).await;
        assert!(matches!(result.unwrap_err(), Error::DuplicatePhone { phone } if phone == "111"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_player_refused_while_sold() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let player = create_test_player(&db, "Gill", 2000).await?;

        let mut details = test_player_details("Shubman Gill", &player.phone, 2000);
        let updated = update_player(&db, player.id, details.clone(), &feed).await?;
        assert_eq!(updated.name, "Shubman Gill");

        sell_test_player(&db, player.id, team.id, 4000).await?;
        details.name = "S. Gill".to_string();
        let result = update_player(&db, player.id, details.clone(), &feed).await;
        assert!(matches!(result.unwrap_err(), Error::PlayerLocked { .. }));

        let result = update_player(&db, 999, details, &feed).await;
        assert!(matches!(result.unwrap_err(), Error::PlayerNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_players_by_status_and_serial_lookup() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let mut details = test_player_details("Zaheer", "201", 2000);
        details.auction_serial_number = Some(17);
        let zaheer = create_player(&db, details, &feed).await?;
        let ajit = create_test_player(&db, "Ajit", 2000).await?;
        sell_test_player(&db, ajit.id, team.id, 2000).await?;

        let all = list_players(&db, None).await?;
        assert_eq!(
            all.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["Ajit", "Zaheer"]
        );
        let unsold = unsold_queue(&db).await?;
        assert_eq!(unsold.len(), 1);
        assert_eq!(unsold[0].id, zaheer.id);

        assert_eq!(find_player_by_serial(&db, 17).await?.unwrap().id, zaheer.id);
        assert!(find_player_by_serial(&db, 18).await?.is_none());
        assert_eq!(find_player_by_name(&db, " Zaheer ").await?.unwrap().id, zaheer.id);
        assert!(find_player_by_name(&db, "Ajit").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_set_player_photo() -> Result<()> {
        let (db, feed, _) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let player = create_test_player(&db, "Kuldeep", 2000).await?;

        let updated = set_player_photo(&db, player.id, "/assets/players/1.jpg", &feed).await?;
        assert_eq!(updated.photo_url, "/assets/players/1.jpg");

        sell_test_player(&db, player.id, team.id, 2000).await?;
        let result = set_player_photo(&db, player.id, "/assets/players/2.jpg", &feed).await;
        assert!(matches!(result.unwrap_err(), Error::PlayerLocked { .. }));

        let result = set_player_photo(&db, 999, "/x.jpg", &feed).await;
        assert!(matches!(result.unwrap_err(), Error::PlayerNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_name_lookup_skips_sold_namesake() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let first = create_test_player(&db, "Rahul", 2000).await?;
        let second = create_test_player(&db, "Rahul", 2000).await?;

        // Both unsold: ambiguous
        let ambiguous = find_player_by_name(&db, "Rahul").await;
        assert!(matches!(ambiguous.unwrap_err(), Error::Validation { .. }));

        sell_test_player(&db, first.id, team.id, 2000).await?;
        let found = find_player_by_name(&db, "Rahul").await?.unwrap();
        assert_eq!(found.id, second.id);

        let state = crate::core::auction::set_next_player(&db, &settings, Some(found.id), &feed)
            .await?;
        assert_eq!(state.current_player_id, Some(second.id));
        Ok(())
    }

    #[test]
    fn test_parse_player_records() {
        let json = r#"[
            {"Name": "Rahul", "Age": "31", "Category": "Batsman", "Ph": "98450 00001"},
            {"Name": "Kuldeep", "Age": "", "Category": "Bowler", "Ph": "98450-00002", "PlayerType": "ICON"}
        ]"#;
        let records = parse_player_records(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phone, "98450 00001");
        assert!(records[0].player_type.is_none());
        assert_eq!(records[1].player_type.as_deref(), Some("ICON"));
    }

    #[tokio::test]
    async fn test_import_upserts_by_phone() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let records = parse_player_records(
            r#"[
                {"Name": "Rahul", "Age": "31", "Category": "Batsman", "Ph": "98450 00001"},
                {"Name": "", "Age": "", "Category": "", "Ph": "98450-00002", "PlayerType": "ICON"},
                {"Name": "Mystery", "Age": "", "Category": "Wicket Keeper", "Ph": "3"}
            ]"#,
        )?;

        let summary = import_players(&db, &settings, &records, &feed).await?;
        assert_eq!(
            summary,
            ImportSummary {
                inserted: 2,
                updated: 0,
                skipped: 1
            }
        );

        let unknown = Player::find()
            .filter(player::Column::Phone.eq("9845000002"))
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(unknown.name, "Unknown");
        assert_eq!(unknown.category, PlayerCategory::AllRounder);
        assert_eq!(unknown.player_type, PlayerType::Icon);
        assert_eq!(unknown.base_price, settings.default_base_price);
        assert_eq!(unknown.photo_url, settings.placeholder_photo);

        // A re-import refreshes details of unsold players and skips sold ones
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        sell_test_player(&db, unknown.id, team.id, 2000).await?;
        let again = import_players(&db, &settings, &records[..2], &feed).await?;
        assert_eq!(
            again,
            ImportSummary {
                inserted: 0,
                updated: 1,
                skipped: 1
            }
        );
        assert_eq!(list_players(&db, None).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_players_file() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let path = std::env::temp_dir().join(format!("auction-import-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"Name": "Venkatesh", "Age": "31", "Category": "Bowler", "Ph": "98450 77777"}]"#,
        )?;

        let summary = import_players_file(&db, &settings, &path, &feed).await;
        std::fs::remove_file(&path)?;
        assert_eq!(summary?.inserted, 1);

        let missing = import_players_file(&db, &settings, "no-such-file.json", &feed).await;
        assert!(matches!(missing, Err(Error::Io(_))));
        Ok(())
    }
}

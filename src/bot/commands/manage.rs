//! Management Discord commands - corrections, team and player records, export and audit.
//!
//! Sale corrections go through `core::ledger` so balances are recomputed by the same code as a
//! sale. Photo and logo uploads fall back to a placeholder and never block saving the record.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, views},
        config::settings::DEFAULT_TEAM_BUDGET,
        core::{assets, export, ledger, player, report, team},
        entities::player::{PlayerCategory, PlayerType},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::path::Path;
    use tracing::warn;

    const PAGE_LIMIT: usize = 1900;

    /// Downloads an attachment, returning its bytes and file extension.
    async fn download(attachment: Option<&serenity::Attachment>) -> Option<(Vec<u8>, String)> {
        let attachment = attachment?;
        let extension = Path::new(&attachment.filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_ascii_lowercase();
        match attachment.download().await {
            Ok(bytes) => Some((bytes, extension)),
            Err(e) => {
                warn!(filename = %attachment.filename, "Attachment download failed: {e}");
                None
            }
        }
    }

    /// Uploads an attachment for a record that is already saved. Returns the new reference only
    /// when the upload succeeded.
    async fn upload_for_saved(
        data: &BotData,
        attachment: Option<&serenity::Attachment>,
        path_for: impl FnOnce(&str) -> String,
        current: &str,
    ) -> Option<String> {
        let (bytes, extension) = download(attachment).await?;
        let path = path_for(&extension);
        let upload = Some((bytes.as_slice(), path.as_str()));
        let resolved = assets::resolve_asset(&data.assets, upload, Some(current), current).await;
        (resolved != current).then_some(resolved)
    }

    /// A replacement wins, then `clear` empties the field, otherwise the current value stays.
    fn merge_field<T>(replacement: Option<T>, clear: bool, current: Option<T>) -> Option<T> {
        match replacement {
            Some(value) => Some(value),
            None if clear => None,
            None => current,
        }
    }

    fn parse_category(value: &str) -> Result<PlayerCategory> {
        PlayerCategory::parse(value).ok_or_else(|| {
            Error::validation(format!(
                "Unknown category '{value}'. Use Batsman, Bowler or All Rounder."
            ))
        })
    }

    const fn player_type(icon: bool) -> PlayerType {
        if icon { PlayerType::Icon } else { PlayerType::Regular }
    }

    async fn resolve_team(
        ctx: poise::Context<'_, BotData, Error>,
        team_name: &str,
    ) -> Result<crate::entities::team::Model> {
        team::get_team_by_name(&ctx.data().database, team_name)
            .await?
            .ok_or_else(|| Error::TeamNotFound {
                id: team_name.to_string(),
            })
    }

    /// Lists every sale in auction order.
    #[poise::command(slash_command, prefix_command)]
    pub async fn transactions(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let sales = report::list_transactions(&ctx.data().database).await?;
        for page in views::paginate(&views::transactions_text(&sales), PAGE_LIMIT) {
            ctx.say(page).await?;
        }
        Ok(())
    }

    /// Corrects the team and amount of a sale.
    #[poise::command(slash_command)]
    pub async fn edit_transaction(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Transaction ID (see /transactions)"] transaction_id: i64,
        #[description = "Team that bought the player"]
        #[autocomplete = "autocomplete::autocomplete_team_name"]
        team_name: String,
        #[description = "Correct amount"] amount: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let buyer = resolve_team(ctx, &team_name).await?;
        let corrected = ledger::edit_transaction(
            &data.database,
            transaction_id,
            buyer.id,
            amount,
            data.settings.min_bid,
            &data.feed,
        )
        .await?;

        let name = player::get_player(&data.database, corrected.player_id)
            .await?
            .map_or_else(|| format!("Player {}", corrected.player_id), |p| p.name);
        ctx.say(format!(
            "✅ Sale #{} corrected: **{name}** → **{}** for **{}** (new transaction ID: {}).",
            corrected.auction_order,
            buyer.name,
            report::format_currency(corrected.final_amount),
            corrected.id
        ))
        .await?;
        Ok(())
    }

    /// Reverses a sale. The team is refunded and the player goes back to unsold.
    #[poise::command(slash_command)]
    pub async fn delete_transaction(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Transaction ID (see /transactions)"] transaction_id: i64,
        #[description = "Set to true to confirm deletion"] confirm: bool,
    ) -> Result<()> {
        if !confirm {
            ctx.say(format!(
                "⚠️ Deleting transaction {transaction_id} refunds the team and returns the player \
                 to the queue. Re-run with `confirm: true` to proceed."
            ))
            .await?;
            return Ok(());
        }

        let data = ctx.data();
        let deleted = ledger::delete_transaction(&data.database, transaction_id, &data.feed).await?;
        ctx.say(format!(
            "🗑️ Transaction {} deleted. {} refunded to team {}.",
            deleted.id,
            report::format_currency(deleted.final_amount),
            team::get_team(&data.database, deleted.team_id)
                .await?
                .map_or_else(|| deleted.team_id.to_string(), |t| t.name)
        ))
        .await?;
        Ok(())
    }

    /// Parent command for team management.
    #[poise::command(slash_command, subcommands("team_add", "team_update"))]
    pub async fn team(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Team management. Available subcommands: `/team add`, `/team update`")
            .await?;
        Ok(())
    }

    /// Registers a new team.
    #[poise::command(slash_command, rename = "add")]
    pub async fn team_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Team name"] name: String,
        #[description = "Starting budget (default 100000)"] base_budget: Option<i64>,
        #[description = "Logo image"] logo: Option<serenity::Attachment>,
        #[description = "Logo URL, used when no image is uploaded"] logo_url: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let logo_ref = assets::resolve_asset(
            &data.assets,
            None,
            logo_url.as_deref(),
            &data.settings.placeholder_logo,
        )
        .await;

        let mut created = team::create_team(
            &data.database,
            &name,
            &logo_ref,
            base_budget.unwrap_or(DEFAULT_TEAM_BUDGET),
            &data.feed,
        )
        .await?;
        let uploaded = upload_for_saved(
            data,
            logo.as_ref(),
            |ext| assets::team_logo_path(&created.name, ext),
            &created.logo_url,
        )
        .await;
        if let Some(url) = uploaded {
            created = team::set_team_logo(&data.database, created.id, &url, &data.feed).await?;
        }
        ctx.say(format!(
            "✅ Team **{}** added with a budget of {}.",
            created.name,
            report::format_currency(created.base_budget)
        ))
        .await?;
        Ok(())
    }

    /// Renames a team or changes its budget or logo.
    #[poise::command(slash_command, rename = "update")]
    pub async fn team_update(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Team to update"]
        #[autocomplete = "autocomplete::autocomplete_team_name"]
        team_name: String,
        #[description = "New name"] new_name: Option<String>,
        #[description = "New starting budget"] base_budget: Option<i64>,
        #[description = "New logo image"] logo: Option<serenity::Attachment>,
        #[description = "New logo URL"] logo_url: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let current = resolve_team(ctx, &team_name).await?;
        let name = new_name.unwrap_or_else(|| current.name.clone());
        let logo_ref = logo_url.unwrap_or_else(|| current.logo_url.clone());

        let mut updated = team::update_team(
            &data.database,
            current.id,
            &name,
            &logo_ref,
            base_budget.unwrap_or(current.base_budget),
            &data.feed,
        )
        .await?;
        let uploaded = upload_for_saved(
            data,
            logo.as_ref(),
            |ext| assets::team_logo_path(&updated.name, ext),
            &updated.logo_url,
        )
        .await;
        if let Some(url) = uploaded {
            updated = team::set_team_logo(&data.database, updated.id, &url, &data.feed).await?;
        }
        ctx.say(format!(
            "✅ Team **{}** updated. Budget {}, remaining {}.",
            updated.name,
            report::format_currency(updated.base_budget),
            report::format_currency(updated.current_balance)
        ))
        .await?;
        Ok(())
    }

    /// Parent command for player management.
    #[poise::command(slash_command, subcommands("player_add", "player_update"))]
    pub async fn player(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Player management. Available subcommands: `/player add`, `/player update`")
            .await?;
        Ok(())
    }

    /// Registers a new player.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, rename = "add")]
    pub async fn player_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player name"] name: String,
        #[description = "Phone number"] phone: String,
        #[description = "Batsman, Bowler or All Rounder"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "Base price (default from config)"] base_price: Option<i64>,
        #[description = "Age"] age: Option<String>,
        #[description = "Marquee (ICON) player"] icon: Option<bool>,
        #[description = "Auction serial number"] serial: Option<i32>,
        #[description = "Jersey number"] jersey_number: Option<i32>,
        #[description = "Name on the jersey"] jersey_name: Option<String>,
        #[description = "Photo"] photo: Option<serenity::Attachment>,
        #[description = "Photo URL, used when no image is uploaded"] photo_url: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let category = parse_category(&category)?;
        let photo_ref = assets::resolve_asset(
            &data.assets,
            None,
            photo_url.as_deref(),
            &data.settings.placeholder_photo,
        )
        .await;

        let details = player::PlayerDetails {
            name,
            age: age.unwrap_or_default(),
            category,
            phone,
            photo_url: photo_ref,
            player_type: player_type(icon.unwrap_or(false)),
            base_price: base_price.unwrap_or(data.settings.default_base_price),
            auction_serial_number: serial,
            is_valid_player: true,
            jersey_number,
            jersey_name,
        };
        let mut created = player::create_player(&data.database, details, &data.feed).await?;
        let uploaded = upload_for_saved(
            data,
            photo.as_ref(),
            |ext| assets::player_photo_path(&created.phone, ext),
            &created.photo_url,
        )
        .await;
        if let Some(url) = uploaded {
            created = player::set_player_photo(&data.database, created.id, &url, &data.feed).await?;
        }
        ctx.say(format!(
            "✅ Player **{}** ({}) added with base price {}.",
            created.name,
            created.category,
            report::format_currency(created.base_price)
        ))
        .await?;
        Ok(())
    }

    /// Edits an unsold player's details.
    #[allow(clippy::too_many_arguments)]
    #[poise::command(slash_command, rename = "update")]
    pub async fn player_update(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Player to update"]
        #[autocomplete = "autocomplete::autocomplete_editable_player"]
        player_name: String,
        #[description = "New name"] new_name: Option<String>,
        #[description = "New phone number"] phone: Option<String>,
        #[description = "Batsman, Bowler or All Rounder"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: Option<String>,
        #[description = "New base price"] base_price: Option<i64>,
        #[description = "Age"] age: Option<String>,
        #[description = "Marquee (ICON) player"] icon: Option<bool>,
        #[description = "Auction serial number"] serial: Option<i32>,
        #[description = "Registration verified"] valid: Option<bool>,
        #[description = "Jersey number"] jersey_number: Option<i32>,
        #[description = "Name on the jersey"] jersey_name: Option<String>,
        #[description = "New photo"] photo: Option<serenity::Attachment>,
        #[description = "Remove the auction serial number"] clear_serial: Option<bool>,
        #[description = "Remove the jersey number and name"] clear_jersey: Option<bool>,
    ) -> Result<()> {
        let data = ctx.data();
        let current = player::find_player_by_name(&data.database, &player_name)
            .await?
            .ok_or_else(|| Error::PlayerNotFound {
                id: player_name.clone(),
            })?;
        let category = match category.as_deref() {
            Some(value) => parse_category(value)?,
            None => current.category,
        };
        let phone = phone.unwrap_or_else(|| current.phone.clone());
        let clear_serial = clear_serial.unwrap_or(false);
        let clear_jersey = clear_jersey.unwrap_or(false);

        let details = player::PlayerDetails {
            name: new_name.unwrap_or_else(|| current.name.clone()),
            age: age.unwrap_or_else(|| current.age.clone()),
            category,
            phone,
            photo_url: current.photo_url.clone(),
            player_type: icon.map_or(current.player_type, player_type),
            base_price: base_price.unwrap_or(current.base_price),
            auction_serial_number: merge_field(serial, clear_serial, current.auction_serial_number),
            is_valid_player: valid.unwrap_or(current.is_valid_player),
            jersey_number: merge_field(jersey_number, clear_jersey, current.jersey_number),
            jersey_name: merge_field(jersey_name, clear_jersey, current.jersey_name.clone()),
        };
        let mut updated =
            player::update_player(&data.database, current.id, details, &data.feed).await?;
        let uploaded = upload_for_saved(
            data,
            photo.as_ref(),
            |ext| assets::player_photo_path(&updated.phone, ext),
            &updated.photo_url,
        )
        .await;
        if let Some(url) = uploaded {
            updated = player::set_player_photo(&data.database, updated.id, &url, &data.feed).await?;
        }
        ctx.say(format!("✅ Player **{}** updated.", updated.name))
            .await?;
        Ok(())
    }

    /// Imports players from a JSON file of registration records.
    #[poise::command(slash_command)]
    pub async fn import_players(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "JSON array of {Name, Age, Category, Ph, PlayerType}"]
        file: serenity::Attachment,
    ) -> Result<()> {
        ctx.defer().await?;
        let data = ctx.data();

        let bytes = file.download().await?;
        let json = std::str::from_utf8(&bytes)
            .map_err(|e| Error::validation(format!("Import file is not UTF-8: {e}")))?;
        let records = player::parse_player_records(json)?;
        let summary =
            player::import_players(&data.database, &data.settings, &records, &data.feed).await?;

        ctx.say(format!(
            "✅ Import finished: {} added, {} updated, {} skipped.",
            summary.inserted, summary.updated, summary.skipped
        ))
        .await?;
        Ok(())
    }

    /// Downloads every sale as a CSV file.
    #[poise::command(slash_command)]
    pub async fn export(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.defer().await?;
        let data = ctx.data();

        let bytes = export::export_results_csv(&data.database).await?;
        let filename = export::export_filename(
            &data.settings.export_prefix,
            chrono::Utc::now().date_naive(),
        );
        ctx.send(
            poise::CreateReply::default()
                .content(format!("📄 Auction results: `{filename}`"))
                .attachment(serenity::CreateAttachment::bytes(bytes, filename)),
        )
        .await?;
        Ok(())
    }

    /// Checks every team balance and player status against the recorded sales.
    #[poise::command(slash_command, prefix_command)]
    pub async fn audit(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let found = ledger::audit_ledger(&ctx.data().database).await?;
        if found.is_empty() {
            ctx.say("✅ Ledger is consistent: every balance matches its sales.")
                .await?;
            return Ok(());
        }

        let listing = found
            .iter()
            .map(|d| format!("• {d}"))
            .collect::<Vec<_>>()
            .join("\n");
        let text = format!("⚠️ {} discrepancies found:\n{listing}", found.len());
        for page in views::paginate(&text, PAGE_LIMIT) {
            ctx.say(page).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        #![allow(clippy::unwrap_used)]
        use super::*;

        #[test]
        fn test_merge_field() {
            assert_eq!(merge_field(Some(7), false, Some(3)), Some(7));
            assert_eq!(merge_field(Some(7), true, Some(3)), Some(7));
            assert_eq!(merge_field(None, false, Some(3)), Some(3));
            assert_eq!(merge_field::<i32>(None, true, Some(3)), None);
        }

        #[test]
        fn test_parse_category_refuses_unknown_role() {
            assert!(matches!(
                parse_category("Wicket Keeper").unwrap_err(),
                Error::Validation { .. }
            ));
        }
    }
}

// Re-export all commands
pub use inner::*;

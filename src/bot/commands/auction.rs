//! Live auction Discord commands - running the block and the spectator display.
//!
//! Every command reads what it needs from the store and replies from the committed result; the
//! only state kept here is the message a `/display` keeps editing.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, views},
        core::{auction, ledger, player, report, team},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::time::Duration;
    use tokio::sync::broadcast::error::RecvError;
    use tracing::{debug, info};

    const DEFAULT_DISPLAY_MINUTES: u64 = 60;
    const MAX_DISPLAY_MINUTES: u64 = 240;

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

    async fn player_on_block(
        ctx: poise::Context<'_, BotData, Error>,
    ) -> Result<Option<crate::entities::player::Model>> {
        let db = &ctx.data().database;
        match auction::get_auction_state(db).await?.current_player_id {
            Some(id) => player::get_player(db, id).await,
            None => Ok(None),
        }
    }

    /// Opens the auction.
    #[poise::command(slash_command)]
    pub async fn start_auction(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        auction::start_auction(&data.database, &data.feed).await?;
        ctx.say("✅ Auction started.").await?;
        Ok(())
    }

    /// Closes the auction. The player on the block stays selected.
    #[poise::command(slash_command)]
    pub async fn stop_auction(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        auction::stop_auction(&data.database, &data.feed).await?;
        ctx.say("⏸️ Auction stopped.").await?;
        Ok(())
    }

    /// Puts a player on the block by serial number or name.
    #[poise::command(slash_command)]
    pub async fn next_player(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Auction serial number of the player"] serial: Option<i32>,
        #[description = "Name of the player"]
        #[autocomplete = "autocomplete::autocomplete_unsold_player"]
        name: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let db = &data.database;

        let found = match (serial, name.as_deref()) {
            (Some(serial), _) => player::find_player_by_serial(db, serial)
                .await?
                .ok_or_else(|| Error::PlayerNotFound {
                    id: format!("serial #{serial}"),
                })?,
            (None, Some(name)) => {
                player::find_player_by_name(db, name)
                    .await?
                    .ok_or_else(|| Error::PlayerNotFound {
                        id: name.to_string(),
                    })?
            }
            (None, None) => {
                ctx.say(
                    "❌ Give a serial number or a player name. \
                     Use `/advance` to take the next in the queue.",
                )
                .await?;
                return Ok(());
            }
        };

        auction::set_next_player(db, &data.settings, Some(found.id), &data.feed).await?;
        ctx.say(format!("🔨 **{}** is on the block. Bidding is open.", found.name))
            .await?;
        Ok(())
    }

    /// Moves on to the next unsold player in the queue.
    #[poise::command(slash_command)]
    pub async fn advance(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let state =
            auction::advance_to_next_player(&data.database, &data.settings, &data.feed).await?;
        let reply = match state.current_player_id {
            Some(id) => {
                let name = player::get_player(&data.database, id)
                    .await?
                    .map_or_else(|| format!("Player {id}"), |p| p.name);
                format!("🔨 **{name}** is on the block. Bidding is open.")
            }
            None => "🏁 No unsold players left in the queue.".to_string(),
        };
        ctx.say(reply).await?;
        Ok(())
    }

    /// Sells the player on the block to a team.
    #[poise::command(slash_command)]
    pub async fn sell(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Buying team"]
        #[autocomplete = "autocomplete::autocomplete_team_name"]
        team_name: String,
        #[description = "Winning bid"] amount: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let Some(on_block) = player_on_block(ctx).await? else {
            ctx.say("❌ There is no player on the block. Use `/next_player` first.")
                .await?;
            return Ok(());
        };
        let buyer = resolve_team(ctx, &team_name).await?;

        let sale = ledger::sell_at_next_order(
            &data.database,
            on_block.id,
            buyer.id,
            amount,
            &data.feed,
        )
        .await?;
        let remaining = team::get_team(&data.database, buyer.id)
            .await?
            .map_or(0, |t| t.current_balance);

        ctx.say(format!(
            "🎉 **{}** SOLD to **{}** for **{}** (sale #{}). {} has {} left.",
            on_block.name,
            buyer.name,
            report::format_currency(sale.final_amount),
            sale.auction_order,
            buyer.name,
            report::format_currency(remaining)
        ))
        .await?;
        Ok(())
    }

    /// Passes over the player on the block and moves to the next one.
    #[poise::command(slash_command)]
    pub async fn unsold(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let data = ctx.data();
        let Some(on_block) = player_on_block(ctx).await? else {
            ctx.say("❌ There is no player on the block.").await?;
            return Ok(());
        };

        let state =
            ledger::mark_unsold(&data.database, &data.settings, on_block.id, &data.feed).await?;
        let next = match state.current_player_id {
            Some(id) => player::get_player(&data.database, id).await?,
            None => None,
        };
        let reply = next.map_or_else(
            || format!("➖ **{}** went unsold. The queue is empty.", on_block.name),
            |p| {
                format!(
                    "➖ **{}** went unsold. **{}** is now on the block.",
                    on_block.name, p.name
                )
            },
        );
        ctx.say(reply).await?;
        Ok(())
    }

    /// Shows the current player and every team's balance.
    #[poise::command(slash_command, prefix_command)]
    pub async fn board(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let board = report::auction_board(&ctx.data().database).await?;
        ctx.send(poise::CreateReply::default().embed(views::board_embed(&board)))
            .await?;
        Ok(())
    }

    /// Posts a live board in this channel and keeps it updated.
    #[poise::command(slash_command)]
    pub async fn display(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How long to keep the board live (default 60)"] minutes: Option<u64>,
    ) -> Result<()> {
        let data = ctx.data();
        let minutes = minutes
            .unwrap_or(DEFAULT_DISPLAY_MINUTES)
            .clamp(1, MAX_DISPLAY_MINUTES);
        let mut events = data.feed.subscribe();

        let board = report::auction_board(&data.database).await?;
        let mut message = ctx
            .channel_id()
            .send_message(
                ctx.serenity_context(),
                serenity::CreateMessage::new().embed(views::board_embed(&board)),
            )
            .await?;
        ctx.say(format!("📺 Live board running for {minutes} minutes."))
            .await?;
        info!(channel = %ctx.channel_id(), minutes, "Live board started");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(minutes * 60);
        loop {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Err(_) | Ok(Err(RecvError::Closed)) => break,
                Ok(Err(RecvError::Lagged(skipped))) => {
                    debug!(skipped, "Live board lagged, refreshing");
                }
                Ok(Ok(_)) => {}
            }
            let board = report::auction_board(&data.database).await?;
            message
                .edit(
                    ctx.serenity_context(),
                    serenity::EditMessage::new().embed(views::board_embed(&board)),
                )
                .await?;
        }

        info!(channel = %ctx.channel_id(), "Live board stopped");
        Ok(())
    }

    /// Shows spent and remaining budget for every team.
    #[poise::command(slash_command, prefix_command)]
    pub async fn standings(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let standings = report::team_standings(&ctx.data().database).await?;
        let embed = serenity::CreateEmbed::default()
            .title("📊 Team Standings")
            .description(views::standings_text(&standings))
            .color(0x0058_65F2);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Lists the players a team has bought.
    #[poise::command(slash_command, prefix_command)]
    pub async fn roster(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Team to show"]
        #[autocomplete = "autocomplete::autocomplete_team_name"]
        team_name: String,
    ) -> Result<()> {
        let found = resolve_team(ctx, &team_name).await?;
        let roster = report::team_roster(&ctx.data().database, found.id).await?;
        for page in views::paginate(&views::roster_text(&found.name, &roster), 1900) {
            ctx.say(page).await?;
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

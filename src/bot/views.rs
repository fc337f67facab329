//! Text rendering for the live display and the management listings.
//!
//! Views hold no state of record; every render takes a fresh read model from `core::report`.

use crate::core::{
    auction::AuctionPhase,
    report::{AuctionBoard, RosterEntry, SaleRecord, TeamStanding, format_currency},
};
use poise::serenity_prelude as serenity;

/// Embed colour for the live board.
const BOARD_COLOUR: u32 = 0x0034_98DB;
/// Embed colour once the displayed player is sold.
const SOLD_COLOUR: u32 = 0x0027_AE60;

/// One-line summary of where the auction stands.
#[must_use]
pub fn phase_line(board: &AuctionBoard) -> String {
    let name = board
        .current_player
        .as_ref()
        .map_or("nobody", |p| p.name.as_str());
    match board.phase {
        AuctionPhase::Idle => "⏸️ Auction is not running".to_string(),
        AuctionPhase::AwaitingPlayer => "⏳ Waiting for the next player".to_string(),
        AuctionPhase::Bidding { .. } => format!("🔨 Bidding open for **{name}**"),
        AuctionPhase::Closed { .. } => match &board.current_sale {
            Some(sale) => format!(
                "🎉 **{name}** SOLD to **{}** for **{}**",
                sale.team_name(),
                format_currency(sale.result.final_amount)
            ),
            None => format!("🔒 Bidding closed for **{name}**"),
        },
    }
}

/// Details of the player on the block.
#[must_use]
pub fn player_card(board: &AuctionBoard) -> Option<String> {
    let player = board.current_player.as_ref()?;
    let mut card = format!(
        "**{}** ({})\nCategory: {}\nBase price: {}",
        player.name,
        player.player_type,
        player.category,
        format_currency(player.base_price)
    );
    if let Some(serial) = player.auction_serial_number {
        card.push_str(&format!("\nSerial #{serial}"));
    }
    if !player.age.is_empty() {
        card.push_str(&format!("\nAge: {}", player.age));
    }
    Some(card)
}

/// Per-team balance lines for the board.
#[must_use]
pub fn team_lines(board: &AuctionBoard) -> String {
    if board.teams.is_empty() {
        return "No teams yet.".to_string();
    }
    board
        .teams
        .iter()
        .map(|t| {
            format!(
                "**{}**: {} left, {} player{}",
                t.name,
                format_currency(t.current_balance),
                t.players_count,
                if t.players_count == 1 { "" } else { "s" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The live board as an embed.
#[must_use]
pub fn board_embed(board: &AuctionBoard) -> serenity::CreateEmbed {
    let colour = if board.is_current_player_sold() {
        SOLD_COLOUR
    } else {
        BOARD_COLOUR
    };
    let mut embed = serenity::CreateEmbed::default()
        .title("🏏 Live Auction")
        .description(phase_line(board))
        .color(colour)
        .field("Teams", team_lines(board), false)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "State version {}",
            board.state.version
        )));

    if let Some(card) = player_card(board) {
        embed = embed.field("On the block", card, false);
    }
    if let Some(player) = &board.current_player {
        if player.photo_url.starts_with("http") {
            embed = embed.thumbnail(player.photo_url.clone());
        }
    }
    embed
}

/// Standings table, one line per team.
#[must_use]
pub fn standings_text(standings: &[TeamStanding]) -> String {
    if standings.is_empty() {
        return "No teams yet.".to_string();
    }
    standings
        .iter()
        .map(|s| {
            format!(
                "**{}**: spent {}, remaining {}, players {}",
                s.team.name,
                format_currency(s.spent),
                format_currency(s.remaining),
                s.players_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Roster lines in auction order.
#[must_use]
pub fn roster_text(team_name: &str, roster: &[RosterEntry]) -> String {
    if roster.is_empty() {
        return format!("**{team_name}** has not bought any players yet.");
    }
    let total: i64 = roster.iter().map(|r| r.amount).sum();
    let lines: Vec<String> = roster
        .iter()
        .map(|r| {
            format!(
                "#{} **{}** ({}) - {}",
                r.auction_order,
                r.player.name,
                r.player.category,
                format_currency(r.amount)
            )
        })
        .collect();
    format!(
        "**{team_name}** ({} players, {} spent)\n{}",
        roster.len(),
        format_currency(total),
        lines.join("\n")
    )
}

/// Transaction listing for the management console.
#[must_use]
pub fn transactions_text(sales: &[SaleRecord]) -> String {
    if sales.is_empty() {
        return "No players sold yet.".to_string();
    }
    sales
        .iter()
        .map(|s| {
            format!(
                "`{}` #{} **{}** → {} for {} ({})",
                s.result.id,
                s.result.auction_order,
                s.player_name(),
                s.team_name(),
                format_currency(s.result.final_amount),
                s.result.sold_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits long listings into chunks that fit a Discord message.
#[must_use]
pub fn paginate(text: &str, limit: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if !current.is_empty() && current.len() + line.len() + 1 > limit {
            pages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{auction, events::ChangeFeed, ledger, report};
    use crate::errors::Result;
    use crate::test_utils::*;

    #[test]
    fn test_paginate_respects_limit() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(paginate(text, 9), vec!["aaaa\nbbbb", "cccc"]);
        assert_eq!(paginate(text, 100), vec![text]);
        assert!(paginate("", 10).is_empty());
    }

    #[tokio::test]
    async fn test_board_lines_follow_the_auction() -> Result<()> {
        let (db, feed, settings) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let player = create_test_player(&db, "Dhoni", 2000).await?;

        let board = report::auction_board(&db).await?;
        assert_eq!(phase_line(&board), "⏸️ Auction is not running");
        assert!(player_card(&board).is_none());
        assert_eq!(team_lines(&board), "**Sharks**: ₹1,00,000 left, 0 players");

        auction::start_auction(&db, &feed).await?;
        auction::set_next_player(&db, &settings, Some(player.id), &feed).await?;
        let board = report::auction_board(&db).await?;
        assert_eq!(phase_line(&board), "🔨 Bidding open for **Dhoni**");
        assert!(player_card(&board).unwrap().contains("Base price: ₹2,000"));

        ledger::sell_player(&db, player.id, team.id, 15_000, 1, &ChangeFeed::new()).await?;
        let board = report::auction_board(&db).await?;
        assert_eq!(
            phase_line(&board),
            "🎉 **Dhoni** SOLD to **Sharks** for **₹15,000**"
        );
        assert_eq!(team_lines(&board), "**Sharks**: ₹85,000 left, 1 player");
        Ok(())
    }

    #[tokio::test]
    async fn test_roster_and_standings_text() -> Result<()> {
        let (db, _, _) = setup_auction().await?;
        let team = create_test_team(&db, "Sharks", 100_000).await?;
        let player = create_test_player(&db, "Dhoni", 2000).await?;
        assert_eq!(
            roster_text("Sharks", &[]),
            "**Sharks** has not bought any players yet."
        );

        sell_test_player(&db, player.id, team.id, 15_000).await?;
        let roster = report::team_roster(&db, team.id).await?;
        assert_eq!(
            roster_text("Sharks", &roster),
            "**Sharks** (1 players, ₹15,000 spent)\n#1 **Dhoni** (All Rounder) - ₹15,000"
        );

        let standings = report::team_standings(&db).await?;
        assert_eq!(
            standings_text(&standings),
            "**Sharks**: spent ₹15,000, remaining ₹85,000, players 1"
        );
        Ok(())
    }
}

//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions are read from the store on every keystroke, so a team or player added from another
//! console shows up immediately.

use crate::{
    bot::BotData,
    core::{player, team},
    entities::player::{PlayerCategory, PlayerStatus},
    errors::Error,
};
use sea_orm::Iterable;

/// Discord accepts at most this many suggestions.
const MAX_SUGGESTIONS: usize = 25;

fn matching<I>(names: I, partial: &str) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let partial_lower = partial.to_lowercase();
    names
        .into_iter()
        .filter(|name| name.to_lowercase().contains(&partial_lower))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Suggests team names.
pub async fn autocomplete_team_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(teams) = team::list_teams(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(teams.into_iter().map(|t| t.name), partial)
}

/// Suggests players that can still be put on the block.
pub async fn autocomplete_unsold_player(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(players) = player::unsold_queue(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(players.into_iter().map(|p| p.name), partial)
}

/// Suggests players whose details may be edited.
pub async fn autocomplete_editable_player(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(players) = player::list_players(&ctx.data().database, None).await else {
        return Vec::new();
    };
    matching(
        players
            .into_iter()
            .filter(|p| p.status != PlayerStatus::Sold)
            .map(|p| p.name),
        partial,
    )
}

/// Suggests playing roles.
pub async fn autocomplete_category(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching(PlayerCategory::iter().map(|c| c.to_string()), partial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_is_case_insensitive() {
        let names = vec!["Bellandur Sharks".to_string(), "Bulldozers".to_string()];
        assert_eq!(matching(names.clone(), "SHARK"), vec!["Bellandur Sharks"]);
        assert_eq!(matching(names, "").len(), 2);
    }

    #[test]
    fn test_matching_caps_suggestions() {
        let names = (0..40).map(|i| format!("Player {i}"));
        assert_eq!(matching(names, "player").len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_category_suggestions() {
        let roles = matching(PlayerCategory::iter().map(|c| c.to_string()), "round");
        assert_eq!(roles, vec![PlayerCategory::AllRounder.to_string()]);
    }
}

//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Auction Desk Help**\n\
        Here is a summary of all available commands.\n\n\
        **Running the auction**\n\
        • `/start_auction`, `/stop_auction` - Opens or closes the auction.\n\
        • `/next_player [serial] [name]` - Puts a player on the block.\n\
        • `/advance` - Moves on to the next unsold player.\n\
        • `/sell <team> <amount>` - Sells the player on the block.\n\
        • `/unsold` - Passes over the player on the block.\n\n\
        **Display**\n\
        • `/board` - Shows the current player and team balances.\n\
        • `/display [minutes]` - Keeps a live board updated in this channel.\n\
        • `/standings`, `/roster <team>`, `/transactions` - Spending summaries.\n\n\
        **Corrections and management**\n\
        • `/edit_transaction <id> <team> <amount>` - Corrects a sale.\n\
        • `/delete_transaction <id> <confirm>` - Reverses a sale.\n\
        • `/team add|update`, `/player add|update` - Manages teams and players.\n\
        • `/import_players <file>` - Imports players from a JSON file.\n\
        • `/export` - Downloads the results as CSV.\n\
        • `/audit` - Checks every team balance against its sales.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

mod ask;
mod config;
mod preview;

use crate::state::Context;

/// Citeline - agent chat with live citations
#[poise::command(
    slash_command,
    subcommands("ask::ask", "preview::preview", "config::config")
)]
pub async fn citeline(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

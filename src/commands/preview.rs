use poise::CreateReply;

use crate::citations::is_citations_block_incomplete;
use crate::render::chunk::{truncate_for_edit, MESSAGE_LIMIT};
use crate::render::{render_parsed, ParsedCitations};
use crate::state::Context;

/// Render raw agent output the way a reply would show it
#[poise::command(slash_command)]
pub async fn preview(
    ctx: Context<'_>,
    #[description = "Raw agent output (write \\n for line breaks)"] text: Option<String>,
    #[description = "Render as if the reply were still streaming"] streaming: Option<bool>,
) -> Result<(), anyhow::Error> {
    let streaming = streaming.unwrap_or(false);
    let options = ctx.data().render_config.read().await.options();

    // Slash command options are single-line
    let raw = text.map(|t| unescape_newlines(&t));
    let parsed = ParsedCitations::parse_opt(raw.as_deref());
    let raw = raw.unwrap_or_default();
    let frame = render_parsed(&raw, &parsed, streaming, &options);

    let report = format!(
        "**Citations:** {} | **Suppressed:** {} | **Block incomplete:** {} | **Streaming:** {}\n\n{}",
        parsed.citations.len(),
        yes_no(frame.is_loading()),
        yes_no(is_citations_block_incomplete(&raw)),
        yes_no(streaming),
        frame.to_message(&options),
    );

    ctx.send(
        CreateReply::default()
            .content(truncate_for_edit(&report, MESSAGE_LIMIT))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_newlines() {
        assert_eq!(
            unescape_newlines(r#"See [cite-1].\n<citations>\n{"id":"cite-1"}"#),
            "See [cite-1].\n<citations>\n{\"id\":\"cite-1\"}"
        );
    }
}

use std::time::Duration;

use poise::CreateReply;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::llm::Message;
use crate::prompts;
use crate::render::chunk::{split_chunks, truncate_for_edit, MESSAGE_LIMIT};
use crate::render::FrameRenderer;
use crate::state::Context;

/// Discord rate-limits message edits; never tick faster than this.
const MIN_FRAME_INTERVAL_MS: u64 = 250;

/// Tracks the text Discord last accepted so that a frame is only sent when
/// it differs, and a failed edit is retried on the next tick.
#[derive(Debug, Default)]
struct ShownFrame {
    text: String,
}

impl ShownFrame {
    fn needs_edit(&self, text: &str) -> bool {
        !text.trim().is_empty() && text != self.text
    }

    fn confirm(&mut self, text: String) {
        self.text = text;
    }
}

/// Ask the agent a question
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
) -> Result<(), anyhow::Error> {
    let config = ctx.data().render_config.read().await.clone();
    let options = config.options();
    let frame_interval =
        Duration::from_millis(config.frame_interval_ms.max(MIN_FRAME_INTERVAL_MS));

    info!(
        user = ctx.author().name,
        model = ctx.data().llm.model(),
        question,
        "Ask started"
    );

    let reply = ctx.say("*Thinking...*").await?;

    let messages = vec![
        Message::system(prompts::SYSTEM_PROMPT),
        Message::user(question.clone()),
    ];
    let mut deltas = match ctx.data().llm.chat_stream(&messages).await {
        Ok(rx) => rx,
        Err(e) => {
            error!(error = %e, "Failed to open LLM stream");
            reply
                .edit(ctx, CreateReply::default().content(format!("Request failed: {}", e)))
                .await?;
            return Ok(());
        }
    };

    let mut renderer = FrameRenderer::new(options);
    let mut raw = String::new();
    let mut shown = ShownFrame::default();
    let mut stream_error = None;
    let mut dirty = false;
    let mut frames = 0u32;

    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            delta = deltas.recv() => match delta {
                Some(Ok(text)) => {
                    raw.push_str(&text);
                    dirty = true;
                }
                Some(Err(e)) => {
                    warn!(error = %e, raw_len = raw.len(), "Reply stream failed");
                    stream_error = Some(e);
                    break;
                }
                None => break,
            },
            _ = ticker.tick(), if dirty => {
                dirty = false;
                let frame = renderer.render(&raw, true);
                let text = truncate_for_edit(&frame.to_message(&options), MESSAGE_LIMIT);
                if shown.needs_edit(&text) {
                    frames += 1;
                    debug!(frames, loading = frame.is_loading(), raw_len = raw.len(), "Frame");
                    match reply.edit(ctx, CreateReply::default().content(text.clone())).await {
                        Ok(()) => shown.confirm(text),
                        Err(e) => {
                            // Keep streaming; the next tick or the final edit catches up
                            warn!(error = %e, frames, "Frame edit failed");
                            dirty = true;
                        }
                    }
                }
            }
        }
    }

    let frame = renderer.render(&raw, false);
    if frame.is_loading() {
        // Markers that never resolve keep the placeholder up
        warn!(raw_len = raw.len(), "Reply ended with unresolved citation markers");
    }

    let mut text = frame.to_message(&options);
    if let Some(e) = &stream_error {
        text.push_str(&format!("\n\n*Reply interrupted: {}*", e));
    }
    if text.trim().is_empty() {
        text = "*The agent returned an empty reply.*".to_string();
    }

    let chunks = split_chunks(&text, MESSAGE_LIMIT);
    if let Some((first, rest)) = chunks.split_first() {
        reply
            .edit(ctx, CreateReply::default().content(first.to_string()))
            .await?;
        for chunk in rest {
            ctx.say(*chunk).await?;
        }
    }

    let citations = renderer.parsed(&raw).citations.len();
    info!(
        frames,
        raw_len = raw.len(),
        citations,
        chunks = chunks.len(),
        interrupted = stream_error.is_some(),
        "Ask complete"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shown_frame_skips_unchanged_text() {
        let mut shown = ShownFrame::default();
        assert!(!shown.needs_edit("  "));
        assert!(shown.needs_edit("*Loading citations...*"));
        shown.confirm("*Loading citations...*".to_string());
        assert!(!shown.needs_edit("*Loading citations...*"));
        assert!(shown.needs_edit("Answer"));
    }

    #[test]
    fn test_shown_frame_retries_after_failed_edit() {
        let mut shown = ShownFrame::default();
        shown.confirm("First".to_string());
        // An edit of "Second" failed, so it was never confirmed
        assert!(shown.needs_edit("Second"));
        assert!(shown.needs_edit("Second"));
        shown.confirm("Second".to_string());
        assert!(!shown.needs_edit("Second"));
    }
}

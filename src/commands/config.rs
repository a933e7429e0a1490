use crate::state::{parse_flag, Context, RenderConfig};

const PARAMS: &str =
    "`frame_interval_ms`, `synthetic_external`, `sources_footer`, `max_placeholder_titles`";

/// Configure reply rendering (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "frame_interval_ms | synthetic_external | sources_footer | max_placeholder_titles"]
    param: Option<String>,
    #[description = "New value"] value: Option<String>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = ctx.data().render_config.read().await;
            ctx.say(describe(&config)).await?;
        }
        // Set a parameter
        (Some(key), Some(val)) => {
            let mut config = ctx.data().render_config.write().await;
            let reply = match apply(&mut config, key, &val) {
                Ok(()) => format!("`{}` set to {}", key, val.trim()),
                Err(msg) => msg,
            };
            drop(config);
            ctx.say(reply).await?;
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/citeline config sources_footer off`")
                .await?;
        }
    }

    Ok(())
}

fn describe(config: &RenderConfig) -> String {
    format!(
        "**Render Configuration:**\n\
         `frame_interval_ms`: {}\n\
         `synthetic_external`: {}\n\
         `sources_footer`: {}\n\
         `max_placeholder_titles`: {}",
        config.frame_interval_ms,
        config.synthetic_external,
        config.sources_footer,
        config.max_placeholder_titles
    )
}

/// Set one parameter, returning a user-facing message on bad input.
fn apply(config: &mut RenderConfig, key: &str, value: &str) -> Result<(), String> {
    let value = value.trim();
    let bad_value = || format!("Invalid value `{}` for `{}`", value, key);
    match key {
        "frame_interval_ms" => {
            config.frame_interval_ms = value.parse().map_err(|_| bad_value())?;
        }
        "synthetic_external" => {
            config.synthetic_external = parse_flag(value).ok_or_else(bad_value)?;
        }
        "sources_footer" => {
            config.sources_footer = parse_flag(value).ok_or_else(bad_value)?;
        }
        "max_placeholder_titles" => {
            config.max_placeholder_titles = value.parse().map_err(|_| bad_value())?;
        }
        _ => return Err(format!("Unknown param `{}`. Valid: {}", key, PARAMS)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        let mut config = RenderConfig::default();
        apply(&mut config, "frame_interval_ms", " 500 ").unwrap();
        apply(&mut config, "synthetic_external", "on").unwrap();
        apply(&mut config, "sources_footer", "no").unwrap();
        apply(&mut config, "max_placeholder_titles", "2").unwrap();
        assert_eq!(config.frame_interval_ms, 500);
        assert!(config.synthetic_external);
        assert!(!config.sources_footer);
        assert_eq!(config.max_placeholder_titles, 2);
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = RenderConfig::default();
        assert!(apply(&mut config, "frame_interval_ms", "fast").is_err());
        assert!(apply(&mut config, "sources_footer", "maybe").is_err());
        let err = apply(&mut config, "colour", "red").unwrap_err();
        assert!(err.starts_with("Unknown param `colour`"));
    }

    #[test]
    fn test_describe() {
        let text = describe(&RenderConfig::default());
        assert!(text.contains("`frame_interval_ms`: 1200"));
        assert!(text.contains("`sources_footer`: true"));
    }
}

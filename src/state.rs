use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::llm::LlmClient;
use crate::render::RenderOptions;

/// Rendering settings (admins can modify at runtime).
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Minimum time between message edits while a reply streams.
    pub frame_interval_ms: u64,
    pub synthetic_external: bool,
    pub sources_footer: bool,
    pub max_placeholder_titles: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let options = RenderOptions::default();
        Self {
            frame_interval_ms: 1200,
            synthetic_external: options.synthetic_external,
            sources_footer: options.sources_footer,
            max_placeholder_titles: options.max_placeholder_titles,
        }
    }
}

impl RenderConfig {
    /// Defaults overridden by `RENDER_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `RENDER_*`
    /// key. Values that fail to parse are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = parse_value::<u64>(lookup("RENDER_FRAME_MS")) {
            config.frame_interval_ms = ms;
        }
        if let Some(flag) = lookup("RENDER_SYNTHETIC_EXTERNAL").and_then(|s| parse_flag(&s)) {
            config.synthetic_external = flag;
        }
        if let Some(flag) = lookup("RENDER_SOURCES_FOOTER").and_then(|s| parse_flag(&s)) {
            config.sources_footer = flag;
        }
        if let Some(n) = parse_value::<usize>(lookup("RENDER_MAX_PLACEHOLDER_TITLES")) {
            config.max_placeholder_titles = n;
        }
        config
    }

    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            synthetic_external: self.synthetic_external,
            sources_footer: self.sources_footer,
            max_placeholder_titles: self.max_placeholder_titles,
        }
    }
}

fn parse_value<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|s| s.trim().parse().ok())
}

/// Accepts true/false, yes/no, on/off and 1/0.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

pub struct AppState {
    pub llm: Arc<LlmClient>,
    pub admin_ids: HashSet<u64>,
    pub render_config: Arc<RwLock<RenderConfig>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;

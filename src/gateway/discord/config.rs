use std::fmt;

/// Default REST endpoint of the Discord API.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Settings required to talk to the Discord REST API.
#[derive(Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub api_base: String,
}

impl DiscordConfig {
    pub fn new(token: impl Into<String>, api_base: Option<&str>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.unwrap_or(DEFAULT_API_BASE).to_owned(),
        }
    }
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

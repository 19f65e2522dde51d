//! Application-level configuration loading: JSON file first, then environment overrides.

use std::{
    env, fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{dao::lobby_store::DEFAULT_LOBBY_TTL, services::interaction_router::PlayerBounds};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCRIM_LOBBY_CONFIG_PATH";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Which lobby store backend to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Mongo,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(StorageBackend::Memory),
            "mongo" | "mongodb" => Some(StorageBackend::Mongo),
            _ => None,
        }
    }
}

#[derive(Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub port: u16,
    /// Lifetime of a lobby record after its last write.
    pub lobby_ttl: Duration,
    pub storage: StorageBackend,
    pub mongo_uri: String,
    pub mongo_db: Option<String>,
    /// Bot token; rendering is disabled without one.
    pub discord_token: Option<String>,
    pub discord_api_base: String,
    pub player_bounds: PlayerBounds,
}

impl AppConfig {
    /// Load the configuration from disk and the process environment.
    pub fn load() -> Self {
        let mut config = Self::from_file(&resolve_config_path());
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    fn from_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Apply `PORT`, `LOBBY_TTL_SECS`, `LOBBY_STORE`, `MONGO_URI`, `MONGO_DB`,
    /// `DISCORD_TOKEN` and `DISCORD_API_BASE` as found through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %port, "ignoring invalid PORT"),
            }
        }

        if let Some(ttl) = lookup("LOBBY_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(secs) => self.lobby_ttl = ttl_or_default(secs),
                Err(_) => warn!(value = %ttl, "ignoring invalid LOBBY_TTL_SECS"),
            }
        }

        if let Some(storage) = lookup("LOBBY_STORE") {
            match StorageBackend::parse(&storage) {
                Some(storage) => self.storage = storage,
                None => warn!(value = %storage, "ignoring unknown LOBBY_STORE"),
            }
        }

        if let Some(uri) = lookup("MONGO_URI").filter(|uri| !uri.is_empty()) {
            self.mongo_uri = uri;
        }
        if let Some(db) = lookup("MONGO_DB").filter(|db| !db.is_empty()) {
            self.mongo_db = Some(db);
        }
        if let Some(token) = lookup("DISCORD_TOKEN").filter(|token| !token.is_empty()) {
            self.discord_token = Some(token);
        }
        if let Some(base) = lookup("DISCORD_API_BASE").filter(|base| !base.is_empty()) {
            self.discord_api_base = base;
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("lobby_ttl", &self.lobby_ttl)
            .field("storage", &self.storage)
            .field("mongo_uri", &self.mongo_uri)
            .field("mongo_db", &self.mongo_db)
            .field("discord_token", &self.discord_token.as_ref().map(|_| "<redacted>"))
            .field("discord_api_base", &self.discord_api_base)
            .field("player_bounds", &self.player_bounds)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            lobby_ttl: DEFAULT_LOBBY_TTL,
            storage: StorageBackend::Memory,
            mongo_uri: DEFAULT_MONGO_URI.into(),
            mongo_db: None,
            discord_token: None,
            discord_api_base: DEFAULT_DISCORD_API_BASE.into(),
            player_bounds: PlayerBounds::default(),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: Option<u16>,
    lobby_ttl_secs: Option<u64>,
    storage: Option<StorageBackend>,
    mongo_uri: Option<String>,
    mongo_db: Option<String>,
    discord_token: Option<String>,
    discord_api_base: Option<String>,
    min_players: Option<u32>,
    max_players: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        let mut bounds = PlayerBounds {
            min: raw.min_players.unwrap_or(defaults.player_bounds.min),
            max: raw.max_players.unwrap_or(defaults.player_bounds.max),
        };
        if bounds.min == 0 || bounds.min > bounds.max {
            warn!(
                min = bounds.min,
                max = bounds.max,
                "invalid player bounds; using defaults"
            );
            bounds = defaults.player_bounds;
        }

        Self {
            port: raw.port.unwrap_or(defaults.port),
            lobby_ttl: raw
                .lobby_ttl_secs
                .map(ttl_or_default)
                .unwrap_or(defaults.lobby_ttl),
            storage: raw.storage.unwrap_or(defaults.storage),
            mongo_uri: raw.mongo_uri.unwrap_or(defaults.mongo_uri),
            mongo_db: raw.mongo_db,
            discord_token: raw.discord_token.filter(|token| !token.is_empty()),
            discord_api_base: raw.discord_api_base.unwrap_or(defaults.discord_api_base),
            player_bounds: bounds,
        }
    }
}

fn ttl_or_default(secs: u64) -> Duration {
    if secs == 0 {
        warn!("lobby TTL of 0 seconds is not allowed; using the default");
        return DEFAULT_LOBBY_TTL;
    }
    Duration::from_secs(secs)
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn file_values_fill_in_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"port": 9000, "storage": "mongo", "max_players": 10}"#)
                .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.port, 9000);
        assert_eq!(config.storage, StorageBackend::Mongo);
        assert_eq!(config.player_bounds.min, 2);
        assert_eq!(config.player_bounds.max, 10);
        assert_eq!(config.lobby_ttl, DEFAULT_LOBBY_TTL);
        assert_eq!(config.discord_token, None);
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars = HashMap::from([
            ("PORT", "3000"),
            ("LOBBY_TTL_SECS", "60"),
            ("LOBBY_STORE", "MongoDB"),
            ("DISCORD_TOKEN", "secret"),
            ("MONGO_DB", ""),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.port, 3000);
        assert_eq!(config.lobby_ttl, Duration::from_secs(60));
        assert_eq!(config.storage, StorageBackend::Mongo);
        assert_eq!(config.discord_token.as_deref(), Some("secret"));
        assert_eq!(config.mongo_db, None);
    }

    #[test]
    fn debug_output_hides_the_discord_token() {
        let config = AppConfig {
            discord_token: Some("bot-secret-token".into()),
            ..AppConfig::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("bot-secret-token"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn invalid_values_are_ignored() {
        let vars = HashMap::from([
            ("PORT", "not-a-port"),
            ("LOBBY_TTL_SECS", "0"),
            ("LOBBY_STORE", "redis"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.lobby_ttl, DEFAULT_LOBBY_TTL);
        assert_eq!(config.storage, StorageBackend::Memory);
    }

    #[test]
    fn inverted_player_bounds_fall_back() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"min_players": 10, "max_players": 4}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.player_bounds.min, 2);
        assert_eq!(config.player_bounds.max, 50);
    }
}

//! Process configuration, read from the environment and an optional `.env`

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const TOKEN_VAR: &str = "TOKEN_COMMUNAUTOSEARCH_BOT";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub telegram_api_url: String,
    pub health_port: u16,
    pub communauto_api_url: String,
    pub city_id: u32,
    /// Delay between two availability queries of one search
    pub poll_interval: Duration,
}

// The token grants full control of the bot
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_token", &"<redacted>")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("health_port", &self.health_port)
            .field("communauto_api_url", &self.communauto_api_url)
            .field("city_id", &self.city_id)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl BotConfig {
    /// Read the process environment, falling back to `./.env` for variables
    /// the environment does not set
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = dotenv_entries(Path::new(".env"));
        Self::from_lookup(env_then_file(|name| std::env::var(name).ok(), &file))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let telegram_token = lookup(TOKEN_VAR)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing(TOKEN_VAR))?;

        let poll_secs: u64 = parse_or(&lookup, "SEARCH_POLL_INTERVAL_SECS", 60)?;
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SEARCH_POLL_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            telegram_token,
            telegram_api_url: lookup("TELEGRAM_API_URL")
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            health_port: parse_or(&lookup, "BOT_HEALTH_PORT", 8444)?,
            communauto_api_url: lookup("COMMUNAUTO_API_URL")
                .unwrap_or_else(|| "https://restapifrontoffice.reservauto.net".to_string()),
            city_id: parse_or(&lookup, "COMMUNAUTO_CITY_ID", 59)?,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

/// Variables of a dotenv file; empty when there is none
fn dotenv_entries(path: &Path) -> HashMap<String, String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => {
            tracing::debug!(path = %path.display(), "No dotenv file");
            return HashMap::new();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable dotenv file");
            return HashMap::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping dotenv line");
                None
            }
        })
        .collect()
}

fn env_then_file<'a>(
    env: impl Fn(&str) -> Option<String> + 'a,
    file: &'a HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |name| env(name).or_else(|| file.get(name).cloned())
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

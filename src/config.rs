//! Configuration loading from environment variables, and the league table.

use crate::models::{League, Sport};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Free public key for TheSportsDB v1 API
pub const DEFAULT_API_KEY: &str = "123";
pub const DEFAULT_BASE_URL: &str = "https://www.thesportsdb.com/api/v1/json";
pub const DEFAULT_DATA_DIR: &str = "cache";
pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;
/// One year
pub const MAX_CACHE_TTL_HOURS: i64 = 24 * 366;
pub const DEFAULT_WEB_ADDR: &str = "127.0.0.1:3000";

/// Leagues fetched by default, grouped by sport
pub const DEFAULT_LEAGUES: &[(&str, &str, Sport)] = &[
    ("4344", "Liga Portugal", Sport::Football),
    ("4328", "Premier League", Sport::Football),
    ("4335", "La Liga", Sport::Football),
    ("4332", "Serie A", Sport::Football),
    ("4331", "Bundesliga", Sport::Football),
    ("4480", "Champions League", Sport::Football),
    ("4387", "NBA", Sport::Basketball),
    ("4546", "EuroLeague", Sport::Basketball),
    ("5616", "CEV Champions League", Sport::Volleyball),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    /// Directory holding the cache and ledger slots
    pub data_dir: PathBuf,
    pub cache_ttl_hours: i64,
    pub web_addr: String,
    pub leagues: Vec<League>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            web_addr: DEFAULT_WEB_ADDR.to_string(),
            leagues: default_leagues(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// Optional variables (with defaults):
    /// - SPORTSDB_API_KEY (123)
    /// - SPORTSDB_BASE_URL
    /// - SPORTCALENDAR_DATA_DIR (cache)
    /// - CACHE_TTL_HOURS (24)
    /// - WEB_ADDR (127.0.0.1:3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_env_only()
    }

    /// Load configuration from environment variables only (no .env file).
    pub fn from_env_only() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let cache_ttl_hours = match env::var("CACHE_TTL_HOURS") {
            Ok(value) => match value.trim().parse::<i64>() {
                Ok(hours) if hours > 0 && hours <= MAX_CACHE_TTL_HOURS => hours,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "CACHE_TTL_HOURS".to_string(),
                        value,
                    })
                }
            },
            Err(_) => defaults.cache_ttl_hours,
        };

        Ok(Self {
            api_key: env::var("SPORTSDB_API_KEY").unwrap_or(defaults.api_key),
            base_url: env::var("SPORTSDB_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            data_dir: env::var("SPORTCALENDAR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cache_ttl_hours,
            web_addr: env::var("WEB_ADDR").unwrap_or(defaults.web_addr),
            leagues: defaults.leagues,
        })
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_ttl_hours.clamp(0, MAX_CACHE_TTL_HOURS))
    }

    pub fn leagues_for(&self, sport: Sport) -> Vec<&League> {
        self.leagues.iter().filter(|l| l.sport == sport).collect()
    }
}

pub fn default_leagues() -> Vec<League> {
    DEFAULT_LEAGUES
        .iter()
        .map(|(id, name, sport)| League::new(id, name, *sport))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        for var in [
            "SPORTSDB_API_KEY",
            "SPORTSDB_BASE_URL",
            "SPORTCALENDAR_DATA_DIR",
            "CACHE_TTL_HOURS",
            "WEB_ADDR",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_with_defaults() {
        clear_vars();

        let config = Config::from_env_only().unwrap();

        assert_eq!(config.api_key, "123");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.data_dir, PathBuf::from("cache"));
        assert_eq!(config.cache_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.leagues.len(), 9);
        assert_eq!(config.leagues_for(Sport::Basketball).len(), 2);
    }

    #[test]
    #[serial]
    fn test_config_overrides() {
        clear_vars();
        env::set_var("SPORTSDB_BASE_URL", "http://localhost:9000/json/");
        env::set_var("CACHE_TTL_HOURS", "6");

        let config = Config::from_env_only().unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/json");
        assert_eq!(config.cache_ttl_hours, 6);

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_ttl() {
        clear_vars();
        env::set_var("CACHE_TTL_HOURS", "soon");

        let result = Config::from_env_only();
        match result {
            Err(ConfigError::InvalidValue { var, .. }) => assert_eq!(var, "CACHE_TTL_HOURS"),
            _ => panic!("Expected InvalidValue error"),
        }

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_config_ttl_out_of_range() {
        clear_vars();
        for value in ["0", "-3", "9999999999999"] {
            env::set_var("CACHE_TTL_HOURS", value);
            assert!(matches!(
                Config::from_env_only(),
                Err(ConfigError::InvalidValue { .. })
            ));
        }
        clear_vars();

        let config = Config {
            cache_ttl_hours: i64::MAX,
            ..Config::default()
        };
        assert_eq!(config.cache_ttl(), chrono::Duration::hours(MAX_CACHE_TTL_HOURS));
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connection string of the backing store
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Seconds between two liveness sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Seconds without a heartbeat after which a participant is pruned
    #[serde(default = "default_staleness_window_secs")]
    pub staleness_window_secs: u64,

    /// Comma separated list of allowed origins; any origin when unset
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,
}

fn default_port() -> u16 {
    5000
}

fn default_database_url() -> String {
    "sqlite://chatroom.db".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    15
}

fn default_staleness_window_secs() -> u64 {
    10
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_environment(config::Environment::default())
    }

    /// Unset keys take their default; a key that is set but unparsable is an error
    pub fn from_environment(source: config::Environment) -> Result<Self> {
        let config = config::Config::builder().add_source(source).build()?;

        let settings: Config = config
            .try_deserialize()
            .context("Invalid configuration in environment")?;

        Ok(settings)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.staleness_window_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: default_database_url(),
            sweep_interval_secs: default_sweep_interval_secs(),
            staleness_window_secs: default_staleness_window_secs(),
            cors_allowed_origins: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.database_url, "sqlite://chatroom.db");
        assert_eq!(config.sweep_interval(), Duration::from_secs(15));
        assert_eq!(config.staleness_window(), Duration::from_secs(10));
        assert!(config.cors_allowed_origins.is_none());
    }

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_environment(environment(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "sqlite://custom.db"),
            ("SWEEP_INTERVAL_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite://custom.db");
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
        assert_eq!(config.staleness_window(), Duration::from_secs(10));
    }

    #[test]
    fn test_unparsable_value_is_an_error() {
        let result = Config::from_environment(environment(&[
            ("SWEEP_INTERVAL_SECS", "fifteen"),
            ("DATABASE_URL", "sqlite://custom.db"),
        ]));

        assert!(result.is_err());
    }
}

//! Engine configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DbConfig;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file (`FOGON_DB_PATH`)
    pub database_path: PathBuf,

    /// Pool size (`FOGON_DB_MAX_CONNECTIONS`)
    pub max_connections: u32,

    /// Seconds to wait for a connection (`FOGON_DB_CONNECT_TIMEOUT_SECS`)
    pub connect_timeout_secs: u64,

    /// Apply embedded migrations on connect (`FOGON_RUN_MIGRATIONS`)
    pub run_migrations: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if set.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = AppConfig {
            database_path: lookup("FOGON_DB_PATH")
                .unwrap_or_else(|| "./fogon.db".to_string())
                .into(),

            max_connections: lookup("FOGON_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FOGON_DB_MAX_CONNECTIONS".to_string()))?,

            connect_timeout_secs: lookup("FOGON_DB_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("FOGON_DB_CONNECT_TIMEOUT_SECS".to_string())
                })?,

            run_migrations: lookup("FOGON_RUN_MIGRATIONS")
                .unwrap_or_else(|| "true".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FOGON_RUN_MIGRATIONS".to_string()))?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "FOGON_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        if config.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("FOGON_DB_PATH".to_string()));
        }

        Ok(config)
    }

    /// Pool settings for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .run_migrations(self.run_migrations)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./fogon.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.connect_timeout_secs, 30);
        assert!(config.run_migrations);
    }

    #[test]
    fn test_overrides_flow_into_db_config() {
        let config = load(&[
            ("FOGON_DB_PATH", "/srv/kitchen.db"),
            ("FOGON_DB_MAX_CONNECTIONS", "8"),
            ("FOGON_DB_CONNECT_TIMEOUT_SECS", "3"),
            ("FOGON_RUN_MIGRATIONS", "false"),
        ])
        .unwrap();

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/srv/kitchen.db"));
        assert_eq!(db.max_connections, 8);
        assert_eq!(db.connect_timeout, Duration::from_secs(3));
        assert!(!db.run_migrations);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("FOGON_DB_MAX_CONNECTIONS", "lots")]),
            Err(ConfigError::InvalidValue(key)) if key == "FOGON_DB_MAX_CONNECTIONS"
        ));
        assert!(load(&[("FOGON_DB_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("FOGON_RUN_MIGRATIONS", "yes")]).is_err());
        assert!(matches!(
            load(&[("FOGON_DB_PATH", "")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}

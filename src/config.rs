use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LedgerError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "keyless.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct KeylessConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LedgerConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_db_path() -> String {
    "./data/ledger".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl KeylessConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| LedgerError::ConfigError(e.to_string()))
    }

    /// Missing file means defaults; an unreadable or malformed one is an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::ConfigError(format!("{}: {}", path, e)))?;
        Self::from_toml(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = KeylessConfig::from_toml("[ledger]\ndb_path = \"/tmp/x\"\n").unwrap();
        assert_eq!(config.ledger.db_path, "/tmp/x");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(matches!(
            KeylessConfig::from_toml("[ledger\n"),
            Err(LedgerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = KeylessConfig::load_or_default("/nonexistent/keyless.toml").unwrap();
        assert_eq!(config, KeylessConfig::default());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyless.toml");
        std::fs::write(&path, "[log]\nlevel = \"debug\"\n").unwrap();
        let config = KeylessConfig::load_or_default(path.to_str().unwrap()).unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.ledger.db_path, "./data/ledger");
    }
}

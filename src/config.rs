//! Runtime configuration
//!
//! Read from `~/.courier/config.yaml` when present, then overridden by
//! `COURIER_*` environment variables. Everything is passed explicitly to the
//! workbench; nothing here is global.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    APP_NAME, APP_VERSION, CONFIG_DIR_NAME, CONFIG_FILE_NAME, DATABASE_FILE_NAME,
    DEFAULT_HISTORY_LIMIT, DEFAULT_TIMEOUT_SECS,
};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub timeout_seconds: u64,
    pub history_limit: usize,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        let dir = config_dir();
        Config {
            database_path: dir.join(DATABASE_FILE_NAME),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_dir: dir,
            log_level: "info".to_string(),
            user_agent: format!("{}/{}", APP_NAME, APP_VERSION),
        }
    }
}

/// `~/.courier`, or `./.courier` when there is no home directory
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

impl Config {
    /// Load from `path`, or the default location when `None`. A missing file
    /// gives defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = config_dir().join(CONFIG_FILE_NAME);
        let path = path.unwrap_or(default_path.as_path());

        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("read {}: {}", path.display(), e)))?;
            Self::from_yaml(&content)?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        };

        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(content).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }

    /// Apply `COURIER_DB`, `COURIER_TIMEOUT` and `COURIER_HISTORY_LIMIT`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(db) = lookup("COURIER_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(timeout) = lookup("COURIER_TIMEOUT") {
            self.timeout_seconds = timeout
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("COURIER_TIMEOUT is not a number: {}", timeout)))?;
        }
        if let Some(limit) = lookup("COURIER_HISTORY_LIMIT") {
            self.history_limit = limit.trim().parse().map_err(|_| {
                Error::Config(format!("COURIER_HISTORY_LIMIT is not a number: {}", limit))
            })?;
        }
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(crate::constants::LOG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("timeout_seconds: 5\ndatabase_path: /tmp/x.db\n").unwrap();
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(matches!(
            Config::from_yaml("timeout_seconds: [nope"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let mut config = Config::from_yaml("").unwrap();
        config.apply_env_overrides(|_| None).unwrap();
        assert_eq!(config.timeout_seconds, DEFAULT_TIMEOUT_SECS);

        let absent = dir.path().join("absent.yaml");
        assert!(Config::load(Some(absent.as_path())).is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("COURIER_DB", "/data/r.db"), ("COURIER_TIMEOUT", " 12 ")]);
        let mut config = Config::default();
        config
            .apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/data/r.db"));
        assert_eq!(config.timeout_seconds, 12);

        let err = config
            .apply_env_overrides(|k| (k == "COURIER_HISTORY_LIMIT").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "history_limit: 7\nlog_level: debug\n").unwrap();
        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.log_level, "debug");
        if env::var("COURIER_HISTORY_LIMIT").is_err() {
            assert_eq!(config.history_limit, 7);
        }
    }
}

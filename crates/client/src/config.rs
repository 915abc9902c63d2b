//! Client configuration, read from the environment.

use std::path::PathBuf;

use thiserror::Error;

use crate::profile_cache::PROFILE_STORAGE_KEY;
use crate::route_guard::ENTRY_PATH;
use crate::storage::default_data_dir;

pub const ENV_ENTRY_PATH: &str = "PORTAL_ENTRY_PATH";
pub const ENV_PROFILE_KEY: &str = "PORTAL_PROFILE_KEY";
pub const ENV_DATA_DIR: &str = "PORTAL_DATA_DIR";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("entry path must start with '/': {0:?}")]
    InvalidEntryPath(String),

    #[error("profile storage key must not be empty")]
    EmptyStorageKey,

    #[error("could not determine a data directory: {0}")]
    NoDataDir(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    /// Sign-in page; unauthenticated users are sent here.
    pub entry_path: String,

    /// Durable-storage slot for the cached profile.
    pub profile_storage_key: String,

    /// Directory for durable local storage.
    pub data_dir: PathBuf,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let entry_path = lookup(ENV_ENTRY_PATH).unwrap_or_else(|| ENTRY_PATH.to_string());

        let profile_storage_key =
            lookup(ENV_PROFILE_KEY).unwrap_or_else(|| PROFILE_STORAGE_KEY.to_string());

        let data_dir = match lookup(ENV_DATA_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let dir = default_data_dir().map_err(|e| ConfigError::NoDataDir(e.to_string()))?;
                tracing::warn!(data_dir = ?dir, "{} not set; using default", ENV_DATA_DIR);
                dir
            }
        };

        let config = Self {
            entry_path,
            profile_storage_key,
            data_dir,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.entry_path.starts_with('/') {
            return Err(ConfigError::InvalidEntryPath(self.entry_path.clone()));
        }
        if self.profile_storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = PortalConfig::from_lookup(lookup(&[(ENV_DATA_DIR, "/tmp/portal")])).unwrap();
        assert_eq!(config.entry_path, "/");
        assert_eq!(config.profile_storage_key, PROFILE_STORAGE_KEY);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/portal"));
    }

    #[test]
    fn overrides_apply() {
        let config = PortalConfig::from_lookup(lookup(&[
            (ENV_ENTRY_PATH, "/login"),
            (ENV_PROFILE_KEY, "tenant-a.profile"),
            (ENV_DATA_DIR, "/var/lib/portal"),
        ]))
        .unwrap();
        assert_eq!(config.entry_path, "/login");
        assert_eq!(config.profile_storage_key, "tenant-a.profile");
    }

    #[test]
    fn relative_entry_path_is_rejected() {
        let err = PortalConfig::from_lookup(lookup(&[
            (ENV_ENTRY_PATH, "login"),
            (ENV_DATA_DIR, "/tmp/portal"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidEntryPath("login".to_string()));
    }

    #[test]
    fn blank_storage_key_is_rejected() {
        let err = PortalConfig::from_lookup(lookup(&[
            (ENV_PROFILE_KEY, "  "),
            (ENV_DATA_DIR, "/tmp/portal"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::EmptyStorageKey);
    }
}

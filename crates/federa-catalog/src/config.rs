//! Sync service configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use federa_core::LogFormat;

use crate::error::{CatalogError, Result};

/// Default upper bound on one connector fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

/// Default number of tables synced concurrently by `sync_database`.
pub const DEFAULT_MAX_PARALLEL_SYNCS: usize = 8;

/// Configuration for the sync service and backup coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Seconds a single `fetch_table` may take before the sync is cancelled.
    pub fetch_timeout_secs: u64,
    /// Maximum number of tables reconciled at once by a database sync.
    pub max_parallel_syncs: usize,
    /// Backup directory used when a request names none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_backup_dir: Option<String>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_parallel_syncs: DEFAULT_MAX_PARALLEL_SYNCS,
            default_backup_dir: None,
            log_format: LogFormat::default(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from `FEDERA_*` environment variables on top of the defaults.
    ///
    /// - `FEDERA_FETCH_TIMEOUT_SECS`
    /// - `FEDERA_MAX_PARALLEL_SYNCS`
    /// - `FEDERA_BACKUP_DIR`
    /// - `FEDERA_LOG_FORMAT` (`json` or `pretty`)
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidInput`] if a variable cannot be parsed or
    /// the result fails [`SyncConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_string = |name: &str| {
            lookup(name).and_then(|v| {
                let trimmed = v.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
        };

        let mut config = Self::default();
        if let Some(v) = env_string("FEDERA_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout_secs = parse_number("FEDERA_FETCH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = env_string("FEDERA_MAX_PARALLEL_SYNCS") {
            config.max_parallel_syncs = parse_number("FEDERA_MAX_PARALLEL_SYNCS", &v)?;
        }
        config.default_backup_dir = env_string("FEDERA_BACKUP_DIR");
        if let Some(v) = env_string("FEDERA_LOG_FORMAT") {
            config.log_format = v.parse::<LogFormat>().map_err(|e: federa_core::Error| {
                CatalogError::InvalidInput {
                    message: format!("FEDERA_LOG_FORMAT: {e}"),
                }
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidInput`] for a zero timeout or zero parallelism.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(CatalogError::InvalidInput {
                message: "fetch timeout must be at least one second".to_string(),
            });
        }
        if self.max_parallel_syncs == 0 {
            return Err(CatalogError::InvalidInput {
                message: "max parallel syncs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the fetch timeout.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Sets the fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    /// Sets the parallelism of database syncs.
    #[must_use]
    pub fn with_max_parallel_syncs(mut self, max: usize) -> Self {
        self.max_parallel_syncs = max;
        self
    }

    /// Installs the global log subscriber in the configured format.
    ///
    /// Binaries embedding the sync service call this once after loading
    /// the configuration.
    pub fn init_logging(&self) {
        federa_core::init_logging(self.log_format);
    }

    /// Sets the default backup directory.
    #[must_use]
    pub fn with_default_backup_dir(mut self, dir: impl Into<String>) -> Self {
        self.default_backup_dir = Some(dir.into());
        self
    }
}

fn parse_number<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| CatalogError::InvalidInput {
        message: format!("{name} must be a non-negative integer: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::default();
        config.validate().unwrap();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(300));
        assert_eq!(config.max_parallel_syncs, 8);
        assert!(config.default_backup_dir.is_none());
    }

    #[test]
    fn reads_environment_overrides() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("FEDERA_FETCH_TIMEOUT_SECS", "30"),
            ("FEDERA_MAX_PARALLEL_SYNCS", " 2 "),
            ("FEDERA_BACKUP_DIR", "/var/backups/federa"),
            ("FEDERA_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.max_parallel_syncs, 2);
        assert_eq!(config.default_backup_dir.as_deref(), Some("/var/backups/federa"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[("FEDERA_BACKUP_DIR", "  ")])).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        for vars in [
            [("FEDERA_FETCH_TIMEOUT_SECS", "soon")],
            [("FEDERA_FETCH_TIMEOUT_SECS", "0")],
            [("FEDERA_MAX_PARALLEL_SYNCS", "0")],
            [("FEDERA_LOG_FORMAT", "xml")],
        ] {
            let err = SyncConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidInput { .. }), "{vars:?}");
        }
    }

    #[test]
    fn installs_logging_in_configured_format() {
        let config = SyncConfig::from_lookup(lookup(&[("FEDERA_LOG_FORMAT", "json")])).unwrap();
        config.init_logging();
        config.init_logging();
        assert!(tracing::dispatcher::has_been_set());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: SyncConfig = serde_json::from_str(r#"{"maxParallelSyncs":3}"#).unwrap();
        assert_eq!(config.max_parallel_syncs, 3);
        assert_eq!(config.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
    }
}

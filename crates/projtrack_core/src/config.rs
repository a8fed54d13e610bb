//! Runtime configuration for storage locations and logging.
//!
//! # Responsibility
//! - Resolve where the workbook, backups and log files live.
//! - Read overrides from the process environment.
//!
//! # Invariants
//! - The workbook and backup directory are always derived from one data
//!   directory, so backups never land next to unrelated files.

use crate::logging::default_log_level;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "PROJTRACK_DATA_DIR";
/// Environment variable enabling file logging into a directory.
pub const ENV_LOG_DIR: &str = "PROJTRACK_LOG_DIR";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "PROJTRACK_LOG_LEVEL";

const DEFAULT_DATA_DIR: &str = "data";
const WORKBOOK_FILE_NAME: &str = "projects.xlsx";
const BACKUP_DIR_NAME: &str = "backups";

/// Resolved tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Root directory for all persisted state.
    pub data_dir: PathBuf,
    /// Canonical workbook holding the current collection.
    pub workbook_file: PathBuf,
    /// Directory holding immutable backup snapshots.
    pub backup_dir: PathBuf,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub log_dir: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
}

impl TrackerConfig {
    /// Builds a configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            workbook_file: data_dir.join(WORKBOOK_FILE_NAME),
            backup_dir: data_dir.join(BACKUP_DIR_NAME),
            data_dir,
            log_dir: None,
            log_level: default_log_level().to_string(),
        }
    }

    /// Builds a configuration from `PROJTRACK_*` environment variables,
    /// falling back to defaults for unset or blank values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config =
            Self::with_data_dir(non_blank(ENV_DATA_DIR).unwrap_or_else(|| DEFAULT_DATA_DIR.into()));
        config.log_dir = non_blank(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::with_data_dir(DEFAULT_DATA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn paths_are_derived_from_data_dir() {
        let config = TrackerConfig::with_data_dir("/srv/tracker");
        assert_eq!(config.workbook_file, PathBuf::from("/srv/tracker/projects.xlsx"));
        assert_eq!(config.backup_dir, PathBuf::from("/srv/tracker/backups"));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn lookup_overrides_and_ignores_blank_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DATA_DIR, "/tmp/pt"),
            (ENV_LOG_DIR, "  "),
            (ENV_LOG_LEVEL, "warn"),
        ]);
        let config = TrackerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pt"));
        assert!(config.log_dir.is_none());
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn lookup_defaults_when_nothing_is_set() {
        let config = TrackerConfig::from_lookup(|_| None);
        assert_eq!(config, TrackerConfig::default());
    }
}

//! Immutable workbook snapshots taken before destructive writes.
//!
//! # Responsibility
//! - Snapshot the reconciled collection into the backup directory.
//! - List and fetch existing snapshots by file name.
//!
//! # Invariants
//! - A snapshot file is created with `create_new`; existing files are never
//!   overwritten.
//! - Names follow `{prefix}_{YYYYMMDDTHHMMSSZ}_{8 hex}.xlsx`, so name order
//!   is chronological order per prefix.
//! - Snapshots are never modified or deleted here.

use crate::config::TrackerConfig;
use crate::model::project::COL_NO;
use crate::sheet::{self, DEFAULT_SHEET_NAME};
use crate::store::record_store::{
    io_error, records_to_table, ProjectStore, StoreError, StoreGuard, StoreResult,
};
use chrono::Utc;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Prefix for general-purpose snapshots.
pub const BACKUP_PREFIX: &str = "backup";
/// Prefix for snapshots taken by replace-mode imports.
pub const REPLACE_BACKUP_PREFIX: &str = "replace_backup";

const BACKUP_EXTENSION: &str = "xlsx";

/// Backup lookup/listing error.
#[derive(Debug)]
pub enum BackupError {
    /// No backup with this name exists.
    NotFound(String),
    Store(StoreError),
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "backup not found: {name}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for BackupError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Manager for the backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(config: &TrackerConfig) -> Self {
        Self::at_dir(config.backup_dir.clone())
    }

    pub fn at_dir(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Snapshots the store's current collection.
    ///
    /// Returns `None` when the workbook does not exist yet or when the
    /// snapshot could not be produced. Destructive callers use
    /// [`BackupManager::try_snapshot`] to tell the two apart.
    pub fn snapshot(
        &self,
        guard: &StoreGuard,
        store: &ProjectStore,
        prefix: &str,
    ) -> Option<PathBuf> {
        self.try_snapshot(guard, store, prefix).ok().flatten()
    }

    /// Snapshots the store's current collection, surfacing failures.
    ///
    /// `Ok(None)` means there was no workbook to copy; an existing workbook
    /// that cannot be read or copied is an error.
    pub fn try_snapshot(
        &self,
        guard: &StoreGuard,
        store: &ProjectStore,
        prefix: &str,
    ) -> StoreResult<Option<PathBuf>> {
        if !store.exists() {
            info!(
                "event=backup_snapshot module=backup status=skip reason=no_workbook prefix={prefix}"
            );
            return Ok(None);
        }

        match self.write_snapshot(guard, store, prefix) {
            Ok(path) => {
                info!(
                    "event=backup_snapshot module=backup status=ok file={}",
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default()
                );
                Ok(Some(path))
            }
            Err(err) => {
                error!(
                    "event=backup_snapshot module=backup status=error prefix={prefix} error={err}"
                );
                Err(err)
            }
        }
    }

    /// Lists snapshot file names, newest first.
    pub fn list(&self) -> Result<Vec<String>, BackupError> {
        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.backup_dir).map_err(io_error(&self.backup_dir))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error(&self.backup_dir))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_workbook = Path::new(&name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(BACKUP_EXTENSION));
            if is_workbook && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Reads one snapshot by file name.
    ///
    /// Names that would escape the backup directory are treated as absent.
    pub fn fetch(&self, name: &str) -> Result<Vec<u8>, BackupError> {
        let path = self
            .resolve(name)
            .filter(|path| path.is_file())
            .ok_or_else(|| BackupError::NotFound(name.to_string()))?;
        Ok(std::fs::read(&path).map_err(io_error(&path))?)
    }

    /// Full path of a snapshot by file name, if the name is a plain file name.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.backup_dir.join(name)),
            _ => None,
        }
    }

    fn write_snapshot(
        &self,
        guard: &StoreGuard,
        store: &ProjectStore,
        prefix: &str,
    ) -> StoreResult<PathBuf> {
        let records = store.try_load(guard)?;
        let bytes = sheet::write_table_to_buffer(
            &records_to_table(&records),
            DEFAULT_SHEET_NAME,
            &[COL_NO],
        )?;

        std::fs::create_dir_all(&self.backup_dir).map_err(io_error(&self.backup_dir))?;
        let path = self.backup_dir.join(snapshot_name(prefix));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_error(&path))?;
        file.write_all(&bytes).map_err(io_error(&path))?;
        file.sync_all().map_err(io_error(&path))?;
        Ok(path)
    }
}

fn snapshot_name(prefix: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{timestamp}_{}.{BACKUP_EXTENSION}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn snapshot_name_has_prefix_timestamp_and_suffix() {
        let name = snapshot_name(REPLACE_BACKUP_PREFIX);
        let pattern = Regex::new(r"^replace_backup_\d{8}T\d{6}Z_[0-9a-f]{8}\.xlsx$").unwrap();
        assert!(pattern.is_match(&name), "unexpected name {name}");
    }

    #[test]
    fn resolve_rejects_paths_outside_backup_dir() {
        let manager = BackupManager::at_dir("/tmp/backups");
        assert!(manager.resolve("backup_1.xlsx").is_some());
        assert!(manager.resolve("../projects.xlsx").is_none());
        assert!(manager.resolve("nested/backup.xlsx").is_none());
        assert!(manager.resolve("").is_none());
    }
}

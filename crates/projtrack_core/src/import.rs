//! Bulk import of uploaded workbooks into the store.
//!
//! # Responsibility
//! - Map arbitrary source headers onto the canonical schema.
//! - Build canonical records from source rows.
//! - Merge them into the store by append or by replace-with-backup.
//!
//! # Invariants
//! - Header matching is exact after lowercasing and stripping spaces and
//!   underscores; there is no fuzzy scoring.
//! - Imported rows always get fresh identities; source `No`/`uid` values are
//!   discarded.
//! - A failed import never leaves a partially written workbook; a failed
//!   replace is rolled back from its snapshot when one exists.
//! - Replace never discards an existing workbook it could not snapshot.

use crate::model::project::{ProjectRecord, COL_NO, SCHEMA_COLUMNS};
use crate::sheet::{self, SheetSelector, Table};
use crate::store::backup::{BackupManager, REPLACE_BACKUP_PREFIX};
use crate::store::record_store::{ProjectStore, StoreError, StoreGuard};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

/// How an imported batch is merged into the existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep existing rows and add the batch after them.
    Append,
    /// Snapshot, then make the batch the whole collection.
    Replace,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Replace => "replace",
        }
    }
}

impl FromStr for ImportMode {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "replace" => Ok(Self::Replace),
            other => Err(ImportError::InvalidMode(other.to_string())),
        }
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub mode: ImportMode,
    pub imported: usize,
    /// Snapshot file name taken before a replace, if any.
    pub backup: Option<String>,
}

/// Import failure.
#[derive(Debug)]
pub enum ImportError {
    /// Mode is neither `append` nor `replace`.
    InvalidMode(String),
    /// The source produced no rows.
    EmptyBatch,
    /// The source could not be parsed; the store is untouched.
    Unreadable(String),
    /// Writing the merged collection failed.
    Persistence {
        source: StoreError,
        backup: Option<String>,
        restored: bool,
    },
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMode(mode) => write!(f, "invalid import mode `{mode}`"),
            Self::EmptyBatch => write!(f, "no rows found in uploaded file"),
            Self::Unreadable(detail) => write!(f, "failed to read uploaded file: {detail}"),
            Self::Persistence {
                source, restored, ..
            } => write!(f, "failed to write imported rows (restored={restored}): {source}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Normalized header key used for column matching.
pub fn column_key(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|ch| *ch != ' ' && *ch != '_')
        .collect()
}

/// Maps canonical columns to source header positions.
///
/// When several source headers normalize to the same canonical column, the
/// right-most one wins. `No` is never mapped.
pub fn map_columns(headers: &[String]) -> BTreeMap<&'static str, usize> {
    let mut mapped = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        let key = column_key(header);
        if let Some(target) = SCHEMA_COLUMNS
            .iter()
            .find(|column| **column != COL_NO && column_key(column) == key)
        {
            mapped.insert(*target, idx);
        }
    }
    mapped
}

/// Builds canonical records from a source table.
///
/// Fully blank rows are skipped. Every record gets a fresh identity.
pub fn build_records(table: &Table) -> Vec<ProjectRecord> {
    let mapped = map_columns(&table.headers);
    table
        .rows
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            let mut record = ProjectRecord::new();
            for (column, idx) in &mapped {
                let value = row.get(*idx).cloned().unwrap_or_default();
                record.set_field(column, value);
            }
            record
        })
        .collect()
}

/// Merges external batches into the store.
pub struct ImportReconciler<'a> {
    store: &'a ProjectStore,
    backups: &'a BackupManager,
}

impl<'a> ImportReconciler<'a> {
    pub fn new(store: &'a ProjectStore, backups: &'a BackupManager) -> Self {
        Self { store, backups }
    }

    /// Decodes workbook bytes and imports the selected sheet.
    pub fn import_bytes(
        &self,
        guard: &StoreGuard,
        bytes: &[u8],
        mode: ImportMode,
        selector: Option<&SheetSelector>,
    ) -> Result<ImportOutcome, ImportError> {
        let table = sheet::read_table_from_bytes(bytes, selector).map_err(|err| {
            warn!("event=import_batch module=import status=error reason=unreadable error={err}");
            ImportError::Unreadable(err.to_string())
        })?;
        self.import_table(guard, &table, mode)
    }

    /// Imports an already decoded table.
    pub fn import_table(
        &self,
        guard: &StoreGuard,
        table: &Table,
        mode: ImportMode,
    ) -> Result<ImportOutcome, ImportError> {
        let mut batch = build_records(table);
        if batch.is_empty() {
            return Err(ImportError::EmptyBatch);
        }
        let imported = batch.len();

        let outcome = match mode {
            ImportMode::Append => {
                let mut combined = self.store.try_load(guard).map_err(without_backup)?;
                combined.append(&mut batch);
                self.store
                    .try_save(guard, &mut combined)
                    .map_err(without_backup)?;
                ImportOutcome {
                    mode,
                    imported,
                    backup: None,
                }
            }
            ImportMode::Replace => self.replace(guard, batch)?,
        };

        info!(
            "event=import_batch module=import status=ok mode={} imported={} backup={}",
            mode.as_str(),
            outcome.imported,
            outcome.backup.as_deref().unwrap_or("none")
        );
        Ok(outcome)
    }

    fn replace(
        &self,
        guard: &StoreGuard,
        mut batch: Vec<ProjectRecord>,
    ) -> Result<ImportOutcome, ImportError> {
        let snapshot = self
            .backups
            .try_snapshot(guard, self.store, REPLACE_BACKUP_PREFIX)
            .map_err(|source| {
                warn!("event=import_batch module=import status=abort reason=backup_failed");
                without_backup(source)
            })?;
        let backup = snapshot.as_deref().and_then(file_name);

        if let Err(source) = self.store.try_save(guard, &mut batch) {
            let restored = match snapshot.as_deref() {
                Some(path) => self.restore(guard, path),
                None => false,
            };
            return Err(ImportError::Persistence {
                source,
                backup,
                restored,
            });
        }

        Ok(ImportOutcome {
            mode: ImportMode::Replace,
            imported: batch.len(),
            backup,
        })
    }

    fn restore(&self, guard: &StoreGuard, snapshot: &Path) -> bool {
        let result = std::fs::read(snapshot)
            .map_err(|err| err.to_string())
            .and_then(|bytes| {
                self.store
                    .restore_bytes(guard, &bytes)
                    .map_err(|err| err.to_string())
            });
        match result {
            Ok(()) => {
                info!(
                    "event=backup_restore module=import status=ok file={}",
                    file_name(snapshot).unwrap_or_default()
                );
                true
            }
            Err(err) => {
                error!("event=backup_restore module=import status=error error={err}");
                false
            }
        }
    }
}

fn without_backup(source: StoreError) -> ImportError {
    ImportError::Persistence {
        source,
        backup: None,
        restored: false,
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

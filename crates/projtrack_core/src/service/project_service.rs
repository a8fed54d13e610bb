//! Project tracker use-case service.
//!
//! # Responsibility
//! - Provide the stable entry points external callers use: CRUD, import,
//!   backups, projections and export.
//! - Translate component errors into the caller-facing [`ServiceError`]
//!   taxonomy.
//!
//! # Invariants
//! - Every public method takes the store lock exactly once and holds it for
//!   its whole load-transform-save sequence.
//! - Write paths load strictly, so an unreadable workbook is never
//!   overwritten by a derived empty collection.
//! - Read paths load leniently and always return a well-formed result.

use crate::config::TrackerConfig;
use crate::export;
use crate::import::{ImportError, ImportMode, ImportOutcome, ImportReconciler};
use crate::model::project::{ProjectRecord, COL_BRD_NO, COL_NO, COL_TITLE, SCHEMA_COLUMNS};
use crate::projection::dashboard::{self, DashboardSummary};
use crate::projection::gantt::{self, GanttEdit, GanttTask};
use crate::projection::timeline::{self, TimelineEvent};
use crate::sheet::{SheetSelector, Table};
use crate::store::backup::{BackupError, BackupManager};
use crate::store::record_store::{ProjectStore, StoreError, StoreGuard};
use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Extra field names accepted for the two required columns on create.
const BRD_NO_ALIAS: &str = "brd_no";
const TITLE_ALIAS: &str = "project";

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing service error.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input violates a precondition.
    Validation(String),
    /// Referenced identity or backup name does not exist.
    NotFound(String),
    /// Uploaded data could not be parsed; the store is untouched.
    Import(String),
    /// The workbook could not be read for writing or could not be written.
    Persistence(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Import(detail) => write!(f, "import failed: {detail}"),
            Self::Persistence(_) => write!(f, "failed to save project data"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value)
    }
}

impl From<BackupError> for ServiceError {
    fn from(value: BackupError) -> Self {
        match value {
            BackupError::NotFound(name) => Self::NotFound(format!("backup `{name}`")),
            BackupError::Store(err) => Self::Persistence(err),
        }
    }
}

impl From<ImportError> for ServiceError {
    fn from(value: ImportError) -> Self {
        match value {
            ImportError::InvalidMode(_) | ImportError::EmptyBatch => {
                Self::Validation(value.to_string())
            }
            ImportError::Unreadable(detail) => Self::Import(detail),
            ImportError::Persistence { source, .. } => Self::Persistence(source),
        }
    }
}

/// Use-case service over one workbook and its backup directory.
pub struct ProjectService {
    store: ProjectStore,
    backups: BackupManager,
}

impl ProjectService {
    pub fn new(config: &TrackerConfig) -> Self {
        Self::from_parts(ProjectStore::new(config), BackupManager::new(config))
    }

    pub fn from_parts(store: ProjectStore, backups: BackupManager) -> Self {
        Self { store, backups }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Returns the canonical collection; empty when the workbook is
    /// unreadable.
    pub fn list_records(&self) -> Vec<ProjectRecord> {
        let guard = self.store.lock();
        self.store.load(&guard)
    }

    /// Creates one record from column-keyed fields.
    ///
    /// # Contract
    /// - `BRD No` and `Project/Fitur` must be non-empty after alias
    ///   resolution, otherwise [`ServiceError::Validation`].
    /// - `No` and the identity are always assigned here, never taken from
    ///   `fields`.
    pub fn create_record(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> ServiceResult<ProjectRecord> {
        let mut record = ProjectRecord::new();
        for column in SCHEMA_COLUMNS.iter().filter(|column| **column != COL_NO) {
            if let Some(value) = lookup_create_field(fields, column) {
                record.set_field(column, value.clone());
            }
        }
        if record.brd_no.trim().is_empty() || record.title.trim().is_empty() {
            return Err(ServiceError::Validation(format!(
                "{COL_BRD_NO} and {COL_TITLE} required"
            )));
        }

        let guard = self.store.lock();
        let mut records = self.load_for_write(&guard, "record_create")?;
        records.push(record);
        self.save(&guard, &mut records, "record_create")?;

        let rows = records.len();
        let created = records.swap_remove(rows - 1);
        info!(
            "event=record_create module=service status=ok uid={} rows={rows}",
            created.uid
        );
        Ok(created)
    }

    /// Applies column-keyed field updates to one record.
    ///
    /// Unknown columns become ad hoc extra columns on that record. The
    /// identity column is ignored.
    pub fn update_record(
        &self,
        id: &str,
        fields: &BTreeMap<String, String>,
    ) -> ServiceResult<ProjectRecord> {
        self.modify_record(id, "record_update", |record| {
            for (column, value) in fields {
                record.set_field(column, value.clone());
            }
        })
    }

    /// Deletes one record and returns the number removed.
    pub fn delete_record(&self, id: &str) -> ServiceResult<usize> {
        let id = id.trim();
        let guard = self.store.lock();
        let mut records = self.load_for_write(&guard, "record_delete")?;
        let before = records.len();
        records.retain(|record| record.uid != id);
        let deleted = before - records.len();
        if deleted == 0 {
            return Err(not_found_record(id));
        }

        self.save(&guard, &mut records, "record_delete")?;
        info!("event=record_delete module=service status=ok uid={id} deleted={deleted}");
        Ok(deleted)
    }

    /// Imports an already decoded table.
    pub fn import_batch(&self, table: &Table, mode: &str) -> ServiceResult<ImportOutcome> {
        let mode = mode.parse::<ImportMode>()?;
        let guard = self.store.lock();
        self.reconciler()
            .import_table(&guard, table, mode)
            .map_err(log_import_failure)
    }

    /// Decodes and imports workbook bytes.
    ///
    /// `sheet` is a zero-based index or a sheet name; `None` or blank picks
    /// the first sheet.
    pub fn import_workbook(
        &self,
        bytes: &[u8],
        mode: &str,
        sheet: Option<&str>,
    ) -> ServiceResult<ImportOutcome> {
        let mode = mode.parse::<ImportMode>()?;
        let selector = sheet.and_then(SheetSelector::parse);
        let guard = self.store.lock();
        self.reconciler()
            .import_bytes(&guard, bytes, mode, selector.as_ref())
            .map_err(log_import_failure)
    }

    /// Lists backup snapshot names, newest first.
    pub fn list_backups(&self) -> ServiceResult<Vec<String>> {
        Ok(self.backups.list()?)
    }

    /// Reads one backup snapshot.
    pub fn fetch_backup(&self, name: &str) -> ServiceResult<Vec<u8>> {
        Ok(self.backups.fetch(name)?)
    }

    pub fn dashboard_summary(&self) -> DashboardSummary {
        dashboard::dashboard_summary(&self.list_records())
    }

    pub fn timeline_events(&self) -> Vec<TimelineEvent> {
        timeline::timeline_events(&self.list_records())
    }

    /// Gantt tasks with missing dates anchored on the current UTC day.
    pub fn gantt_tasks(&self) -> Vec<GanttTask> {
        self.gantt_tasks_at(Utc::now().date_naive())
    }

    pub fn gantt_tasks_at(&self, today: NaiveDate) -> Vec<GanttTask> {
        gantt::gantt_tasks(&self.list_records(), today)
    }

    /// Applies a Gantt date/progress edit and returns the updated record.
    pub fn apply_gantt_edit(&self, id: &str, edit: &GanttEdit) -> ServiceResult<ProjectRecord> {
        self.modify_record(id, "gantt_edit", |record| {
            gantt::apply_gantt_edit(record, edit)
        })
    }

    /// Exports the current collection as `.xlsx` bytes.
    pub fn export_workbook(&self) -> ServiceResult<Vec<u8>> {
        let records = self.list_records();
        export::export_workbook(&records).map_err(|err| ServiceError::Persistence(err.into()))
    }

    fn reconciler(&self) -> ImportReconciler<'_> {
        ImportReconciler::new(&self.store, &self.backups)
    }

    fn modify_record(
        &self,
        id: &str,
        event: &str,
        apply: impl FnOnce(&mut ProjectRecord),
    ) -> ServiceResult<ProjectRecord> {
        let id = id.trim();
        let guard = self.store.lock();
        let mut records = self.load_for_write(&guard, event)?;
        let idx = records
            .iter()
            .position(|record| record.uid == id)
            .ok_or_else(|| not_found_record(id))?;

        apply(&mut records[idx]);
        self.save(&guard, &mut records, event)?;

        info!("event={event} module=service status=ok uid={id}");
        Ok(records.swap_remove(idx))
    }

    fn load_for_write(
        &self,
        guard: &StoreGuard,
        event: &str,
    ) -> ServiceResult<Vec<ProjectRecord>> {
        self.store.try_load(guard).map_err(|err| {
            error!("event={event} module=service status=error stage=load error={err}");
            ServiceError::Persistence(err)
        })
    }

    fn save(
        &self,
        guard: &StoreGuard,
        records: &mut [ProjectRecord],
        event: &str,
    ) -> ServiceResult<()> {
        self.store.try_save(guard, records).map_err(|err| {
            error!("event={event} module=service status=error stage=save error={err}");
            ServiceError::Persistence(err)
        })
    }
}

/// Resolves a create field by exact column name, then by the name with
/// spaces and `/` removed, then lowercased. Required columns also accept a
/// short alias.
///
/// Blank values do not count as a match, so a later spelling still applies.
fn lookup_create_field<'a>(
    fields: &'a BTreeMap<String, String>,
    column: &str,
) -> Option<&'a String> {
    let compact: String = column.chars().filter(|ch| *ch != ' ' && *ch != '/').collect();
    let lower = column.to_lowercase();
    let alias = match column {
        COL_BRD_NO => Some(BRD_NO_ALIAS),
        COL_TITLE => Some(TITLE_ALIAS),
        _ => None,
    };

    let found = [Some(column), Some(compact.as_str()), Some(lower.as_str()), alias]
        .into_iter()
        .flatten()
        .filter_map(|key| fields.get(key))
        .find(|value| !value.trim().is_empty());
    found
}

fn not_found_record(id: &str) -> ServiceError {
    warn!("event=record_lookup module=service status=error reason=not_found uid={id}");
    ServiceError::NotFound(format!("project `{id}`"))
}

fn log_import_failure(err: ImportError) -> ServiceError {
    if let ImportError::Persistence {
        backup, restored, ..
    } = &err
    {
        error!(
            "event=import_batch module=service status=error backup={} restored={restored}",
            backup.as_deref().unwrap_or("none")
        );
    }
    ServiceError::from(err)
}

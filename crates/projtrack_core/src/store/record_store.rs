//! Workbook-backed project record store.
//!
//! # Responsibility
//! - Own the canonical workbook: load with schema repair, save atomically.
//! - Materialize seed data the first time the workbook is needed.
//! - Serialize every load-transform-save sequence behind one process-wide
//!   lock.
//!
//! # Invariants
//! - After load or save, `no` is contiguous `1..=N` in collection order.
//! - Every record has a trimmed, non-empty, unique `uid`.
//! - Status/priority are canonicalized before anything reaches disk.
//! - Callers prove they hold the lock by passing a [`StoreGuard`].

use crate::config::TrackerConfig;
use crate::model::project::{
    new_project_id, ProjectRecord, Status, COL_BRD_NO, COL_COMPLETED, COL_CONTACT, COL_LINK,
    COL_NO, COL_NOTES, COL_PIC, COL_PRIORITY, COL_STATUS, COL_SUBMITTED, COL_TITLE, COL_UID,
    SCHEMA_COLUMNS,
};
use crate::normalize::{format_date, normalize_priority, normalize_status};
use crate::sheet::{self, SheetError, Table, DEFAULT_SHEET_NAME};
use chrono::{Days, NaiveDate, Utc};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

const SEED_RECORD_COUNT: u64 = 5;

static STORE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level persistence error.
#[derive(Debug)]
pub enum StoreError {
    /// Filesystem failure on `path`.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Workbook could not be decoded or encoded.
    Sheet(SheetError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::Sheet(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Sheet(err) => Some(err),
        }
    }
}

impl From<SheetError> for StoreError {
    fn from(value: SheetError) -> Self {
        Self::Sheet(value)
    }
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Proof that the process-wide store lock is held.
///
/// The lock is not reentrant: acquire it once per public operation and pass
/// the guard down.
pub struct StoreGuard {
    _guard: MutexGuard<'static, ()>,
}

/// Workbook-backed store for the full project collection.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    workbook_file: PathBuf,
}

impl ProjectStore {
    /// Creates a store over the workbook configured in `config`.
    pub fn new(config: &TrackerConfig) -> Self {
        Self::at_path(config.workbook_file.clone())
    }

    /// Creates a store over an explicit workbook path.
    pub fn at_path(workbook_file: impl Into<PathBuf>) -> Self {
        Self {
            workbook_file: workbook_file.into(),
        }
    }

    pub fn workbook_file(&self) -> &Path {
        &self.workbook_file
    }

    /// Returns whether the backing workbook currently exists.
    pub fn exists(&self) -> bool {
        self.workbook_file.is_file()
    }

    /// Acquires the process-wide write lock.
    ///
    /// A poisoned lock is recovered: the guarded state lives on disk and
    /// every write replaces the file atomically.
    pub fn lock(&self) -> StoreGuard {
        StoreGuard {
            _guard: STORE_LOCK.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Loads and repairs the collection, surfacing any failure.
    ///
    /// Seeds the workbook first when it does not exist yet.
    pub fn try_load(&self, _guard: &StoreGuard) -> StoreResult<Vec<ProjectRecord>> {
        let started_at = Instant::now();
        if !self.exists() {
            self.write_seed()?;
        }

        let table = sheet::read_table_from_path(&self.workbook_file)?;
        let records = records_from_table(&table);
        info!(
            "event=store_load module=store status=ok rows={} duration_ms={}",
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(records)
    }

    /// Loads the collection, degrading to an empty collection on failure.
    ///
    /// An empty result therefore does not prove the workbook is empty;
    /// the failure is logged for operators.
    pub fn load(&self, guard: &StoreGuard) -> Vec<ProjectRecord> {
        match self.try_load(guard) {
            Ok(records) => records,
            Err(err) => {
                error!(
                    "event=store_load module=store status=error fallback=empty path={} error={}",
                    self.workbook_file.display(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Canonicalizes `records` in place and persists them atomically.
    pub fn try_save(&self, _guard: &StoreGuard, records: &mut [ProjectRecord]) -> StoreResult<()> {
        let started_at = Instant::now();
        self.persist(records)?;
        info!(
            "event=store_save module=store status=ok rows={} duration_ms={}",
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Persists `records`, reporting failure as `false` after logging it.
    pub fn save(&self, guard: &StoreGuard, records: &mut [ProjectRecord]) -> bool {
        match self.try_save(guard, records) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=store_save module=store status=error path={} error={}",
                    self.workbook_file.display(),
                    err
                );
                false
            }
        }
    }

    /// Replaces the workbook with `bytes` verbatim.
    pub(crate) fn restore_bytes(&self, _guard: &StoreGuard, bytes: &[u8]) -> StoreResult<()> {
        self.write_bytes(bytes)
    }

    fn write_seed(&self) -> StoreResult<()> {
        let mut records = seed_records(Utc::now().date_naive());
        self.persist(&mut records)?;
        info!(
            "event=store_seed module=store status=ok rows={} path={}",
            records.len(),
            self.workbook_file.display()
        );
        Ok(())
    }

    fn persist(&self, records: &mut [ProjectRecord]) -> StoreResult<()> {
        canonicalize(records);
        let bytes = sheet::write_table_to_buffer(
            &records_to_table(records),
            DEFAULT_SHEET_NAME,
            &[COL_NO],
        )?;
        self.write_bytes(&bytes)
    }

    fn write_bytes(&self, bytes: &[u8]) -> StoreResult<()> {
        let parent = match self.workbook_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(io_error(&parent))?;

        let mut staged = tempfile::NamedTempFile::new_in(&parent).map_err(io_error(&parent))?;
        staged
            .write_all(bytes)
            .map_err(io_error(&self.workbook_file))?;
        staged.flush().map_err(io_error(&self.workbook_file))?;
        staged
            .persist(&self.workbook_file)
            .map_err(|err| io_error(&self.workbook_file)(err.error))?;
        Ok(())
    }
}

/// Builds the five deterministic seed records relative to `today`.
pub fn seed_records(today: NaiveDate) -> Vec<ProjectRecord> {
    (1..=SEED_RECORD_COUNT)
        .map(|i| {
            let code = 100 + i;
            let mut record = ProjectRecord::new();
            record.brd_no = format!("BRD{code}");
            record.title = format!("Sample Project {i}");
            record.link = format!("https://example.com/brd/{code}");
            record.pic = format!("PIC {i}");
            record.status = Status::New;
            record.priority = "Medium".to_string();
            record.submitted_on = today
                .checked_sub_days(Days::new(30 - i))
                .map(format_date)
                .unwrap_or_default();
            if i % 2 == 0 {
                record.completed_on = today
                    .checked_sub_days(Days::new(27 - i))
                    .map(format_date)
                    .unwrap_or_default();
            }
            record.notes = format!("Catatan {i}");
            record
        })
        .collect()
}

/// Renumbers, fills identities and canonicalizes priority in place.
///
/// Duplicate or blank identities are re-minted for the later occurrence.
pub(crate) fn canonicalize(records: &mut [ProjectRecord]) {
    let mut seen = HashSet::with_capacity(records.len());
    let mut repaired = 0usize;
    for (idx, record) in records.iter_mut().enumerate() {
        record.no = idx + 1;
        let trimmed = record.uid.trim();
        if trimmed.is_empty() || seen.contains(trimmed) {
            record.uid = new_project_id();
            repaired += 1;
        } else if trimmed.len() != record.uid.len() {
            record.uid = trimmed.to_string();
        }
        seen.insert(record.uid.clone());
        record.priority = normalize_priority(Some(&record.priority));
    }
    if repaired > 0 {
        warn!("event=identity_repair module=store status=ok minted={repaired}");
    }
}

/// Decodes workbook rows into canonical records.
///
/// Missing schema columns read as empty; columns outside the schema are
/// dropped.
pub(crate) fn records_from_table(table: &Table) -> Vec<ProjectRecord> {
    let column = |name: &str| table.column_index(name);
    let brd_no = column(COL_BRD_NO);
    let title = column(COL_TITLE);
    let link = column(COL_LINK);
    let pic = column(COL_PIC);
    let contact = column(COL_CONTACT);
    let status = column(COL_STATUS);
    let priority = column(COL_PRIORITY);
    let submitted = column(COL_SUBMITTED);
    let completed = column(COL_COMPLETED);
    let notes = column(COL_NOTES);
    let uid = column(COL_UID);

    let mut records: Vec<ProjectRecord> = (0..table.rows.len())
        .map(|row| {
            let cell = |idx: Option<usize>| {
                idx.map(|col| table.cell(row, col).to_string())
                    .unwrap_or_default()
            };
            let mut record = ProjectRecord::with_id(cell(uid));
            record.brd_no = cell(brd_no);
            record.title = cell(title);
            record.link = cell(link);
            record.pic = cell(pic);
            record.contact_person = cell(contact);
            record.status = normalize_status(Some(&cell(status)));
            record.priority = cell(priority);
            record.submitted_on = cell(submitted);
            record.completed_on = cell(completed);
            record.notes = cell(notes);
            record
        })
        .collect();

    canonicalize(&mut records);
    records
}

/// Encodes records as a table: schema columns, identity, then any ad hoc
/// columns in name order.
pub(crate) fn records_to_table(records: &[ProjectRecord]) -> Table {
    let extra_columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.extra.keys().map(String::as_str))
        .collect();

    let mut headers: Vec<String> = SCHEMA_COLUMNS.iter().map(|c| c.to_string()).collect();
    headers.push(COL_UID.to_string());
    headers.extend(extra_columns.iter().map(|c| c.to_string()));

    let mut table = Table::new(headers);
    table.rows = records
        .iter()
        .map(|record| {
            table
                .headers
                .iter()
                .map(|header| record.get_field(header).unwrap_or_default())
                .collect()
        })
        .collect();
    table
}

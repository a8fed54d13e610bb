//! Spreadsheet export of the canonical collection.
//!
//! # Invariants
//! - Output is a single `Projects` sheet with the same column layout the
//!   store persists.
//! - `No` is recomputed 1..N; the caller's records are not modified.

use crate::model::project::{ProjectRecord, COL_NO};
use crate::sheet::{self, SheetResult, DEFAULT_SHEET_NAME};
use crate::store::record_store::{canonicalize, records_to_table};

/// Encodes `records` as `.xlsx` bytes.
pub fn export_workbook(records: &[ProjectRecord]) -> SheetResult<Vec<u8>> {
    let mut rows = records.to_vec();
    canonicalize(&mut rows);
    sheet::write_table_to_buffer(&records_to_table(&rows), DEFAULT_SHEET_NAME, &[COL_NO])
}

//! Persistence layer over the workbook file and its backups.
//!
//! # Responsibility
//! - Keep workbook decoding/encoding details out of services.
//! - Expose one lock-guarded store and a read-mostly backup manager.
//!
//! # Invariants
//! - Only `ProjectStore` writes the canonical workbook.
//! - `BackupManager` writes only into the backup directory.

pub mod backup;
pub mod record_store;

//! Domain model for tracked projects.
//!
//! # Responsibility
//! - Define the canonical record shape shared by the store, the importer
//!   and every projection.
//!
//! # Invariants
//! - Every record is identified by a stable, non-empty `uid`.
//! - Deletion is a hard delete from the collection; recovery goes through
//!   backups.

pub mod project;

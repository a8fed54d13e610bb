//! Core use-case services.
//!
//! # Responsibility
//! - Compose store, backups, import and projections into caller-level APIs.
//! - Keep CLI and other front ends decoupled from workbook details.

pub mod project_service;

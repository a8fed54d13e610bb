//! Read-only projections over the canonical collection.
//!
//! # Responsibility
//! - Derive dashboard aggregates, timeline events and Gantt tasks from the
//!   same records.
//!
//! # Invariants
//! - Projections never touch the store; they only read records handed in.
//! - Each projection classifies priority text on its own.

pub mod dashboard;
pub mod gantt;
pub mod timeline;

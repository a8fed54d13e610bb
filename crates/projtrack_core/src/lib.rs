//! Core domain logic for the project tracker.
//! This crate is the single source of truth for record invariants.

pub mod config;
pub mod export;
pub mod import;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod projection;
pub mod service;
pub mod sheet;
pub mod store;

pub use config::TrackerConfig;
pub use import::{ImportError, ImportMode, ImportOutcome, ImportReconciler};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::project::{ProjectId, ProjectRecord, Status};
pub use normalize::{normalize_priority, normalize_status};
pub use projection::dashboard::DashboardSummary;
pub use projection::gantt::{GanttEdit, GanttTask};
pub use projection::timeline::{EventKind, TimelineEvent};
pub use service::project_service::{ProjectService, ServiceError, ServiceResult};
pub use sheet::{SheetError, SheetSelector, Table};
pub use store::backup::{BackupError, BackupManager};
pub use store::record_store::{ProjectStore, StoreError, StoreGuard, StoreResult};

/// Minimal health-check API for smoke checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

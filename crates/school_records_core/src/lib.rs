//! Core domain logic for school incident records.
//! This crate is the single source of truth for record invariants.

pub mod config;
pub mod db;
pub mod display;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::report::{Condition, Report, ReportId};
pub use model::ValidationError;
pub use repo::{RepoError, RepoResult};
pub use service::notification_service::RecipientDirectory;
pub use service::report_service::{
    ReportDetail, ReportSaveOutcome, ReportService, ReportServiceError, StudentHistoryView,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

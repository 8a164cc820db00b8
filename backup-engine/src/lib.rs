//! Backup/restore engine for the campus operations platform.
//!
//! Takes a point-in-time snapshot of the entire relational database plus the
//! uploaded-asset tree, packages it into a single portable zip archive,
//! prunes expired archives, and can restore the live database and assets
//! from any retained archive.
//!
//! The transport that triggers these operations (HTTP routes, CLI, the
//! automatic-backup scheduler) lives outside this crate; callers construct
//! an [`EngineState`] and invoke the orchestrators in [`services::backup`]
//! and [`services::restore`].

pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod models;
pub mod services;
pub mod state;

pub use config::EngineConfig;
pub use error::EngineError;
pub use models::archive::{Archive, ArchiveMetadata, BackupSummary, RequestedBy, TriggeredBy};
pub use models::dump::{ColumnValue, DatabaseDump, TableDump};
pub use services::backup::{create_backup, BackupOptions, BackupOutcome};
pub use services::catalog::{backup_summary, list_archives};
pub use services::restore::{restore, RestoreOptions, RestoreOutcome};
pub use state::EngineState;

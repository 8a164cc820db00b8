//! Backup orchestration: gate, serialize, package, prune.

use crate::db::dump::dump_database;
use crate::error::EngineError;
use crate::gate::Operation;
use crate::models::archive::{
    Archive, ArchiveMetadata, RequestedBy, TriggeredBy, METADATA_VERSION,
};
use crate::services::{archive, catalog, retention};
use crate::state::EngineState;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub triggered_by: TriggeredBy,
    pub requested_by: Option<RequestedBy>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupOutcome {
    pub archive: Archive,
    pub deleted_archives: Vec<Archive>,
}

/// Take a full snapshot: serialize the database, package it together with
/// the asset tree into a new archive, then prune expired archives. The
/// gate is released on every exit path via guard drop.
pub async fn create_backup(
    state: &EngineState,
    options: BackupOptions,
) -> Result<BackupOutcome, EngineError> {
    let _guard = state
        .gate
        .try_acquire(Operation::Backup)
        .map_err(EngineError::from_held)?;

    let created_at = Utc::now();
    // Archive names are derived from local wall-clock time.
    let name = format!(
        "backup_{}.zip",
        chrono::Local::now().format("%Y_%m_%d_%H%M%S")
    );
    tracing::info!(archive = %name, triggered_by = ?options.triggered_by, "Starting backup");

    let db = state.db.clone();
    let dump = tokio::task::spawn_blocking(move || {
        let conn = db.get()?;
        dump_database(&conn)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    let metadata = ArchiveMetadata {
        version: METADATA_VERSION,
        created_at,
        triggered_by: options.triggered_by,
        requested_by: options.requested_by.unwrap_or_default(),
        table_counts: dump.table_counts(),
    };

    let archive_dir = state.config.archive_dir.clone();
    let upload_dir = state.config.upload_dir.clone();
    let dest = archive_dir.join(&name);
    let archive = tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&archive_dir)?;
        archive::write_archive(&dump, &metadata, Some(&upload_dir), &dest)?;
        catalog::describe_archive(&dest)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;

    let prune_dir = state.config.archive_dir.clone();
    let retention_days = state.config.retention_days;
    let deleted_archives =
        tokio::task::spawn_blocking(move || retention::prune_expired(&prune_dir, retention_days))
            .await
            .map_err(|e| anyhow::anyhow!(e))??;

    tracing::info!(
        archive = %archive.name,
        size_bytes = archive.size_bytes,
        pruned = deleted_archives.len(),
        "Backup completed"
    );
    Ok(BackupOutcome {
        archive,
        deleted_archives,
    })
}

//! Restore orchestration: extract, transactional reload, asset swap.

use crate::db::restore::restore_dump;
use crate::error::EngineError;
use crate::gate::Operation;
use crate::models::archive::{Archive, ArchiveMetadata, RequestedBy};
use crate::models::dump::DatabaseDump;
use crate::services::{archive, catalog};
use crate::state::EngineState;
use anyhow::Context;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub backup_name: String,
    pub requested_by: Option<RequestedBy>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub archive: Archive,
}

/// Restore the database and asset tree from a stored archive.
///
/// The database reload happens inside a single transaction; the asset tree
/// is swapped only after that transaction commits. The extraction
/// directory is removed on every exit path (tempdir drop), and so is the
/// gate (guard drop).
pub async fn restore(
    state: &EngineState,
    options: RestoreOptions,
) -> Result<RestoreOutcome, EngineError> {
    let _guard = state
        .gate
        .try_acquire(Operation::Restore)
        .map_err(EngineError::from_held)?;

    if !is_bare_file_name(&options.backup_name) {
        return Err(EngineError::ArchiveNotFound(options.backup_name));
    }
    let archive_path = state.config.archive_dir.join(&options.backup_name);
    if !archive_path.is_file() {
        return Err(EngineError::ArchiveNotFound(options.backup_name));
    }

    tracing::info!(
        archive = %options.backup_name,
        requested_by = ?options.requested_by,
        "Starting restore"
    );

    let workdir = tempfile::tempdir().map_err(|e| anyhow::anyhow!(e))?;
    let extract_dir = workdir.path().to_path_buf();

    let src = archive_path.clone();
    let dir = extract_dir.clone();
    tokio::task::spawn_blocking(move || archive::extract_archive(&src, &dir))
        .await
        .map_err(|e| anyhow::anyhow!(e))??;

    if let Some(metadata) = read_extracted_metadata(&extract_dir) {
        tracing::info!(
            created_at = %metadata.created_at,
            tables = metadata.table_counts.len(),
            "Archive descriptor loaded"
        );
    }

    let dump_path = extract_dir.join(archive::DUMP_MEMBER);
    let dump = tokio::task::spawn_blocking(move || parse_dump(&dump_path))
        .await
        .map_err(|e| anyhow::anyhow!(e))??;
    let table_total = dump.tables.len();

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = db.get()?;
        restore_dump(&mut conn, &dump)
    })
    .await
    .map_err(|e| anyhow::anyhow!(e))??;
    tracing::info!(tables = table_total, "Database reload committed");

    // Only after the commit. The swap itself is two-phase: the extracted
    // tree is copied to a staging sibling first, so the live directory is
    // replaced in a single rename.
    let extracted_uploads = extract_dir.join(archive::UPLOADS_MEMBER);
    if extracted_uploads.is_dir() {
        let live = state.config.upload_dir.clone();
        tokio::task::spawn_blocking(move || swap_asset_tree(&extracted_uploads, &live))
            .await
            .map_err(|e| anyhow::anyhow!(e))??;
        tracing::info!("Asset tree replaced");
    }

    let archive = tokio::task::spawn_blocking(move || catalog::describe_archive(&archive_path))
        .await
        .map_err(|e| anyhow::anyhow!(e))??;

    tracing::info!(archive = %archive.name, "Restore completed");
    Ok(RestoreOutcome { archive })
}

/// Archive names are plain file names; anything with path components is
/// treated as not found rather than traversed.
fn is_bare_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn read_extracted_metadata(extract_dir: &Path) -> Option<ArchiveMetadata> {
    let path = extract_dir.join(archive::METADATA_MEMBER);
    if !path.is_file() {
        tracing::warn!("Archive has no metadata descriptor");
        return None;
    }
    let parsed = std::fs::read(&path)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| Ok(serde_json::from_slice(&bytes)?));
    match parsed {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!("Failed to parse archive metadata: {e:#}");
            None
        }
    }
}

fn parse_dump(path: &Path) -> Result<DatabaseDump, EngineError> {
    if !path.is_file() {
        return Err(EngineError::CorruptArchive(
            "database.json is missing from the archive".into(),
        ));
    }
    let bytes = std::fs::read(path).map_err(|e| anyhow::anyhow!(e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| EngineError::CorruptArchive(format!("database.json is unparsable: {e}")))
}

/// Two-phase replacement of the live asset tree: build a staging copy next
/// to it, then remove the live tree and rename the staging copy into
/// place.
fn swap_asset_tree(extracted: &Path, live: &Path) -> anyhow::Result<()> {
    let staging = staging_path(live);
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    copy_tree(extracted, &staging)?;
    if live.exists() {
        std::fs::remove_dir_all(live)?;
    }
    std::fs::rename(&staging, live)
        .with_context(|| format!("Failed to swap asset tree into {}", live.display()))?;
    Ok(())
}

fn staging_path(live: &Path) -> PathBuf {
    let mut name = live
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "uploads".into());
    name.push(".restoring");
    live.with_file_name(name)
}

fn copy_tree(src: &Path, dest: &Path) -> anyhow::Result<()> {
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        } else if entry.file_type().is_symlink() {
            tracing::warn!(path = %entry.path().display(), "Skipping symlink in asset tree");
        }
    }
    Ok(())
}

//! Archive discovery and the embedded metadata descriptor.

use crate::models::archive::{Archive, ArchiveMetadata, BackupSummary};
use crate::services::archive::METADATA_MEMBER;
use crate::state::EngineState;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::fs::File;
use std::path::Path;

pub(crate) const ARCHIVE_PREFIX: &str = "backup_";
pub(crate) const ARCHIVE_EXT: &str = "zip";

/// Read the embedded descriptor. Best-effort: metadata is an annotation,
/// never required for restore correctness, so a missing or corrupt
/// descriptor logs a warning and yields `None`.
pub fn read_metadata(archive_path: &Path) -> Option<ArchiveMetadata> {
    match try_read_metadata(archive_path) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!(
                archive = %archive_path.display(),
                "Failed to read archive metadata: {e:#}"
            );
            None
        }
    }
}

fn try_read_metadata(archive_path: &Path) -> anyhow::Result<ArchiveMetadata> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let member = archive.by_name(METADATA_MEMBER)?;
    Ok(serde_json::from_reader(member)?)
}

/// Stat a stored archive file into its descriptor, attaching metadata.
pub(crate) fn describe_archive(path: &Path) -> anyhow::Result<Archive> {
    let stat = std::fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Archive {
        name,
        created_at: DateTime::<Utc>::from(stat.modified()?),
        size_bytes: stat.len(),
        path: path.to_path_buf(),
        metadata: read_metadata(path),
    })
}

pub(crate) fn is_archive_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().map_or(false, |e| e == ARCHIVE_EXT)
        && path
            .file_name()
            .map_or(false, |n| n.to_string_lossy().starts_with(ARCHIVE_PREFIX))
}

/// Enumerate stored archives, newest first. Files that vanish between
/// listing and stat are skipped rather than failing the whole listing.
pub fn list_stored_archives(archive_dir: &Path) -> anyhow::Result<Vec<Archive>> {
    let mut archives = Vec::new();
    if !archive_dir.is_dir() {
        return Ok(archives);
    }
    for entry in std::fs::read_dir(archive_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_archive_file(&path) {
            continue;
        }
        match describe_archive(&path) {
            Ok(archive) => archives.push(archive),
            Err(e) => tracing::warn!(archive = %path.display(), "Failed to stat archive: {e:#}"),
        }
    }
    // Names are timestamp-derived, so name order is creation order.
    archives.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(archives)
}

pub async fn list_archives(state: &EngineState) -> anyhow::Result<Vec<Archive>> {
    let dir = state.config.archive_dir.clone();
    tokio::task::spawn_blocking(move || list_stored_archives(&dir))
        .await
        .map_err(|e| anyhow::anyhow!(e))?
}

pub async fn backup_summary(state: &EngineState) -> anyhow::Result<BackupSummary> {
    let archives = list_archives(state).await?;
    Ok(BackupSummary {
        total: archives.len(),
        last_backup_at: archives.first().map(|a| a.created_at),
        next_scheduled_backup_at: first_of_next_month(Utc::now())?,
    })
}

/// First day of the next calendar month (UTC). A scheduling hint only; the
/// scheduler that acts on it lives outside this engine.
pub(crate) fn first_of_next_month(now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("Invalid schedule date {year}-{month:02}-01"))
}

//! Retention pruning of expired archives.
//!
//! Pruning runs only as the tail step of a successful backup; if backups
//! stop being taken, pruning stops too.

use crate::models::archive::Archive;
use crate::services::catalog;
use std::path::Path;
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 86_400;

/// Force-delete every archive whose modification time is older than
/// `now − retention_days`, returning descriptors of everything removed so
/// the caller can report them.
pub fn prune_expired(archive_dir: &Path, retention_days: i64) -> anyhow::Result<Vec<Archive>> {
    let window = Duration::from_secs(retention_days.max(0) as u64 * SECONDS_PER_DAY);
    let cutoff = SystemTime::now()
        .checked_sub(window)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    prune_older_than(archive_dir, cutoff)
}

pub(crate) fn prune_older_than(
    archive_dir: &Path,
    cutoff: SystemTime,
) -> anyhow::Result<Vec<Archive>> {
    let mut deleted = Vec::new();
    if !archive_dir.is_dir() {
        return Ok(deleted);
    }
    for entry in std::fs::read_dir(archive_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !catalog::is_archive_file(&path) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if modified >= cutoff {
            continue;
        }
        let descriptor = catalog::describe_archive(&path)?;
        std::fs::remove_file(&path)?;
        tracing::info!(archive = %descriptor.name, "Removed expired archive");
        deleted.push(descriptor);
    }
    Ok(deleted)
}

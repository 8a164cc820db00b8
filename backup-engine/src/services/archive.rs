//! Zip packaging and extraction for backup archives.
//!
//! An archive is fully self-describing: `database.json` (the dump),
//! `metadata.json` (the descriptor), and optionally the asset tree under
//! `uploads/`. Nothing outside the archive is needed to restore it.

use crate::models::archive::ArchiveMetadata;
use crate::models::dump::DatabaseDump;
use anyhow::Context;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DUMP_MEMBER: &str = "database.json";
pub const METADATA_MEMBER: &str = "metadata.json";
pub const UPLOADS_MEMBER: &str = "uploads";

/// Package the dump, its descriptor, and (when present) the asset tree
/// into a single zip at `dest`. The file is staged next to its final path
/// and renamed into place only once fully written and synced, so a crash
/// mid-write never leaves a truncated archive visible to the catalog.
pub fn write_archive(
    dump: &DatabaseDump,
    metadata: &ArchiveMetadata,
    upload_dir: Option<&Path>,
    dest: &Path,
) -> anyhow::Result<()> {
    let staged = dest.with_extension("zip.tmp");
    if let Err(e) = write_archive_to(dump, metadata, upload_dir, &staged) {
        let _ = std::fs::remove_file(&staged);
        return Err(e);
    }
    std::fs::rename(&staged, dest).with_context(|| {
        format!("Failed to move staged archive into place: {}", dest.display())
    })?;
    Ok(())
}

fn write_archive_to(
    dump: &DatabaseDump,
    metadata: &ArchiveMetadata,
    upload_dir: Option<&Path>,
    staged: &Path,
) -> anyhow::Result<()> {
    let file = File::create(staged)
        .with_context(|| format!("Failed to create archive file: {}", staged.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    zip.start_file(DUMP_MEMBER, options)?;
    zip.write_all(&serde_json::to_vec(dump)?)?;

    zip.start_file(METADATA_MEMBER, options)?;
    zip.write_all(&serde_json::to_vec(metadata)?)?;

    if let Some(dir) = upload_dir {
        if dir.is_dir() {
            add_tree(&mut zip, dir, options)?;
        }
    }

    zip.finish()?.sync_all()?;
    Ok(())
}

fn add_tree(
    zip: &mut ZipWriter<File>,
    root: &Path,
    options: SimpleFileOptions,
) -> anyhow::Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(root)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let member = format!(
            "{}/{}",
            UPLOADS_MEMBER,
            relative.to_string_lossy().replace('\\', "/")
        );
        if entry.file_type().is_dir() {
            zip.add_directory(member, options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(member, options)?;
            let mut f = File::open(entry.path())?;
            io::copy(&mut f, zip)?;
        } else if entry.file_type().is_symlink() {
            tracing::warn!(path = %entry.path().display(), "Skipping symlink in asset tree");
        }
    }
    Ok(())
}

/// Unpack every member of `src` under `dest_dir`, refusing entries that
/// would escape it.
pub fn extract_archive(src: &Path, dest_dir: &Path) -> anyhow::Result<()> {
    let file = File::open(src)
        .with_context(|| format!("Failed to open archive: {}", src.display()))?;
    let mut archive = ZipArchive::new(file)?;
    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        let Some(relative) = member.enclosed_name() else {
            anyhow::bail!("Archive member {:?} escapes the extraction directory", member.name());
        };
        let target = dest_dir.join(relative);
        if member.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut member, &mut out)?;
        }
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const METADATA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggeredBy {
    Manual,
    Automatic,
}

/// Identity of whoever requested the backup. Both fields are nullable;
/// automatic backups carry no identity at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedBy {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// The descriptor embedded in every archive as `metadata.json`. Immutable
/// once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMetadata {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub triggered_by: TriggeredBy,
    pub requested_by: RequestedBy,
    pub table_counts: BTreeMap<String, usize>,
}

/// A stored archive file as seen by the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Archive {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ArchiveMetadata>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub total: usize,
    pub last_backup_at: Option<DateTime<Utc>>,
    pub next_scheduled_backup_at: DateTime<Utc>,
}

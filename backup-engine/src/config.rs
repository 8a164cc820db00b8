use std::path::PathBuf;

pub const DEFAULT_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    pub archive_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub retention_days: i64,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".into()));

        Self {
            db_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("campus.db")),
            archive_dir: std::env::var("BACKUPS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("backups")),
            upload_dir: std::env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("uploads")),
            retention_days: std::env::var("BACKUP_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETENTION_DAYS),
        }
    }
}

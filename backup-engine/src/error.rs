use crate::gate::Operation;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("A backup is already in progress")]
    BackupInProgress,

    #[error("A restore is already in progress")]
    RestoreInProgress,

    #[error("Backup {0} not found")]
    ArchiveNotFound(String),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// Concurrency conflicts mean "retry shortly"; everything else is fatal
    /// for the request that hit it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::BackupInProgress | EngineError::RestoreInProgress
        )
    }

    pub(crate) fn from_held(held: Operation) -> Self {
        match held {
            Operation::Backup => EngineError::BackupInProgress,
            Operation::Restore => EngineError::RestoreInProgress,
        }
    }
}

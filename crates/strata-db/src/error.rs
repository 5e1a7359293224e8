//! Error types for strata-db

use strata_core::CoreError;
use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Opening the database failed (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// A dedicated connection for backup or vacuum could not be obtained (D002)
    #[error("[D002] Failed to acquire connection: {0}")]
    ConnectionAcquisitionFailure(String),

    /// A statement failed; the statement text is kept for diagnostics (D003)
    #[error("[D003] SQL execution failed: {message} (statement: {statement})")]
    StatementExecutionFailure { statement: String, message: String },

    /// Reading or writing migration_history failed (D004)
    #[error("[D004] Migration history persistence failed: {0}")]
    HistoryPersistenceFailure(String),

    /// The online backup protocol failed at some step (D005)
    #[error("[D005] Backup failed: {0}")]
    BackupSessionFailure(String),

    /// Adapter has no online backup capability (D006)
    #[error("[D006] Online backup not supported by {backend}")]
    BackupUnsupported { backend: String },

    /// BEGIN, COMMIT, or ROLLBACK failed (D007)
    #[error("[D007] Transaction failed: {0}")]
    TransactionError(String),

    /// File-level space reclamation failed after cleanup committed (D008)
    #[error("[D008] Compaction failed: {0}")]
    CompactionFailure(String),

    /// Filesystem error with path context (D009)
    #[error("[D009] IO error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Cancellation or configuration error from strata-core (D010)
    #[error("[D010] {0}")]
    Core(#[from] CoreError),
}

impl DbError {
    /// Build a [`DbError::StatementExecutionFailure`] for `statement`.
    pub fn statement(statement: &str, err: impl std::fmt::Display) -> Self {
        DbError::StatementExecutionFailure {
            statement: statement.to_string(),
            message: err.to_string(),
        }
    }

    /// True when the caller's context stopped the operation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DbError::Core(e) if e.is_cancellation())
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

//! Error types for strata-store

use strata_catalog::{CatalogError, SchemaKind};
use strata_core::{CoreError, Version};
use strata_db::DbError;
use thiserror::Error;

/// Errors from migrating, seeding, and maintaining a store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A full-schema script failed (M001)
    #[error("[M001] {kind} schema bootstrap failed in {script}: {source}")]
    Bootstrap {
        kind: SchemaKind,
        script: String,
        #[source]
        source: DbError,
    },

    /// A bucket script failed; the bucket was rolled back (M002)
    #[error("[M002] Migration to {version} failed in {script}: {source}")]
    Bucket {
        version: Version,
        script: String,
        #[source]
        source: DbError,
    },

    /// A seed script failed (M003)
    #[error("[M003] Seeding failed in {script}: {source}")]
    Seed {
        script: String,
        #[source]
        source: DbError,
    },

    /// Writing the history row for a version failed (M004)
    #[error("[M004] Failed to record version {version}: {source}")]
    Record {
        version: Version,
        #[source]
        source: DbError,
    },

    /// Script catalog error (M005)
    #[error("[M005] {0}")]
    Catalog(#[from] CatalogError),

    /// Database error outside any script (M006)
    #[error("[M006] {0}")]
    Db(#[from] DbError),

    /// Version, profile, or cancellation error (M007)
    #[error("[M007] {0}")]
    Core(#[from] CoreError),
}

impl StoreError {
    /// True when the caller's context stopped the operation.
    pub fn is_cancellation(&self) -> bool {
        match self {
            StoreError::Core(e) => e.is_cancellation(),
            StoreError::Bootstrap { source, .. }
            | StoreError::Bucket { source, .. }
            | StoreError::Seed { source, .. }
            | StoreError::Record { source, .. } => source.is_cancellation(),
            StoreError::Db(e) => e.is_cancellation(),
            StoreError::Catalog(_) => false,
        }
    }
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;

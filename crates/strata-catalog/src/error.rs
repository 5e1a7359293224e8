//! Error types for strata-catalog

use strata_core::CoreError;
use thiserror::Error;

/// Script catalog errors.
///
/// Every variant points at a packaging defect: the catalog is fixed at build
/// time, so none of these can be fixed by retrying.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Script missing from the bundle or not valid UTF-8 (S001).
    #[error("[S001] Failed to read script '{path}': {reason}")]
    ScriptReadFailure { path: String, reason: String },

    /// No bucket directory with this minor key (S002).
    #[error("[S002] Unknown migration bucket '{minor_key}'")]
    UnknownBucket { minor_key: String },

    /// Two bucket directories resolve to the same version (S003).
    #[error("[S003] Duplicate migration bucket {version}: '{first}' and '{second}'")]
    DuplicateBucket {
        version: String,
        first: String,
        second: String,
    },

    /// Version error from strata-core (S004).
    #[error("[S004] {0}")]
    Core(#[from] CoreError),
}

/// Result type alias for [`CatalogError`].
pub type CatalogResult<T> = Result<T, CatalogError>;

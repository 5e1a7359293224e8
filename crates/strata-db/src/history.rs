//! Persisted record of applied schema versions.
//!
//! Rows live in the `migration_history` table, which the full-schema
//! scripts create. Each row is written once and never updated.

use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use strata_core::{version, Version};

/// Table holding the history rows.
pub const MIGRATION_HISTORY_TABLE: &str = "migration_history";

/// One applied version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationHistory {
    pub version: String,
    pub created_at: DateTime<Utc>,
}

/// Filter for [`MigrationHistoryStore::list_migration_history`].
///
/// The default matches every row.
#[derive(Debug, Clone, Default)]
pub struct MigrationHistoryFind {
    pub version: Option<String>,
}

/// Insert request for [`MigrationHistoryStore::upsert_migration_history`].
#[derive(Debug, Clone)]
pub struct MigrationHistoryUpsert {
    pub version: Version,
}

/// Read and write `migration_history`.
pub trait MigrationHistoryStore {
    /// Rows matching `find`, oldest first.
    fn list_migration_history(&self, find: &MigrationHistoryFind)
        -> DbResult<Vec<MigrationHistory>>;

    /// Insert `upsert.version` unless present; return the stored row either way.
    fn upsert_migration_history(&self, upsert: &MigrationHistoryUpsert)
        -> DbResult<MigrationHistory>;
}

/// `SELECT` for `find`; bind `find.version` when it is set.
pub(crate) fn list_sql(find: &MigrationHistoryFind) -> String {
    let mut sql = format!("SELECT version, created_at FROM {MIGRATION_HISTORY_TABLE}");
    if find.version.is_some() {
        sql.push_str(" WHERE version = ?");
    }
    sql.push_str(" ORDER BY created_at ASC");
    sql
}

pub(crate) const UPSERT_SQL: &str =
    "INSERT INTO migration_history (version, created_at) VALUES (?, ?) ON CONFLICT (version) DO NOTHING";

/// Build records from `(version, created_at)` rows, oldest first.
///
/// Rows written in the same second are ordered by version number, so
/// `0.9.0` lists before `0.10.0`.
pub(crate) fn to_records(rows: Vec<(String, i64)>) -> DbResult<Vec<MigrationHistory>> {
    let mut records = rows
        .into_iter()
        .map(|(version, created_at)| to_record(version, created_at))
        .collect::<DbResult<Vec<_>>>()?;
    records.sort_by(|a, b| {
        a.created_at.cmp(&b.created_at).then_with(|| {
            version::compare(&a.version, &b.version).unwrap_or_else(|_| a.version.cmp(&b.version))
        })
    });
    Ok(records)
}

fn to_record(version: String, created_at: i64) -> DbResult<MigrationHistory> {
    let created_at = DateTime::<Utc>::from_timestamp(created_at, 0).ok_or_else(|| {
        DbError::HistoryPersistenceFailure(format!(
            "created_at {created_at} of version {version} is out of range"
        ))
    })?;
    Ok(MigrationHistory {
        version,
        created_at,
    })
}

/// Read back the row just upserted.
pub(crate) fn expect_one(
    rows: Vec<MigrationHistory>,
    version: &Version,
) -> DbResult<MigrationHistory> {
    rows.into_iter().next().ok_or_else(|| {
        DbError::HistoryPersistenceFailure(format!(
            "version {version} missing from migration_history after upsert"
        ))
    })
}

pub(crate) fn persistence_err(action: &str, err: impl std::fmt::Display) -> DbError {
    DbError::HistoryPersistenceFailure(format!("failed to {action}: {err}"))
}

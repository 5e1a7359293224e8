//! Database adapter traits

use crate::backup::BackupOptions;
use crate::error::{DbError, DbResult};
use crate::history::MigrationHistoryStore;
use std::path::Path;
use strata_core::Context;

/// Statement-level operations, available both on a [`Database`] and on the
/// connection held by an open [`Transaction`].
pub trait Executor: MigrationHistoryStore {
    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Execute one statement, ignoring any rows it returns
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Execute one data-modifying statement, returning affected rows
    fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Number of rows produced by a query
    fn query_count(&self, sql: &str) -> DbResult<i64>;

    /// Check if a table or view exists
    fn relation_exists(&self, name: &str) -> DbResult<bool>;
}

/// Connection abstraction the migration engine, backup, and vacuum run on.
///
/// Every statement is issued sequentially on one connection; adapters wrap
/// it in a `Mutex` so the trait object can be shared across threads.
pub trait Database: Executor + Send + Sync {
    /// Lock the connection and open a transaction on it.
    ///
    /// The lock is held by the returned [`Transaction`]: statements issued
    /// through this `Database` from other threads wait until it commits,
    /// rolls back, or is dropped. Statements of the transaction itself must
    /// go through the handle; calling back into this `Database` on the same
    /// thread deadlocks.
    fn begin(&self) -> DbResult<Box<dyn Transaction + '_>>;

    /// Reclaim file space left by deleted rows. Must run outside a transaction.
    fn compact(&self) -> DbResult<()>;

    /// Online backup capability, if the adapter has one.
    fn online_backup(&self) -> Option<&dyn SupportsOnlineBackup> {
        None
    }

    /// Release the connection, reporting errors from the driver's close.
    fn close(self: Box<Self>) -> DbResult<()>;
}

/// An open transaction owning the adapter's connection.
///
/// Dropping it without calling [`commit`](Transaction::commit) rolls back.
pub trait Transaction: Executor {
    /// Commit; on failure the transaction is rolled back before returning.
    fn commit(self: Box<Self>) -> DbResult<()>;

    fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Copy a live database into another file without blocking other
/// connections' readers or writers.
pub trait SupportsOnlineBackup {
    /// Write a transactionally consistent copy of the database to `dest`.
    ///
    /// `dest` must not exist or be in use. `ctx` is checked between copy
    /// steps. On error `dest` may hold partial content and must be discarded.
    fn backup_into(&self, ctx: &Context, dest: &Path, options: &BackupOptions) -> DbResult<()>;
}

/// Run `body` between `BEGIN` and `COMMIT`, rolling back on error.
///
/// Mirrors the connection-level transaction helper of the adapters, but
/// works on any `Database` and any error type that can carry a `DbError`.
/// `body` gets the transaction handle; the connection stays locked until
/// the helper returns.
pub fn with_transaction<T, E, F>(db: &dyn Database, body: F) -> Result<T, E>
where
    F: FnOnce(&dyn Transaction) -> Result<T, E>,
    E: From<DbError>,
{
    let tx = db.begin()?;

    match body(&*tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                log::warn!("ROLLBACK failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

/// `COMMIT`, or `ROLLBACK` when the commit fails. Shared by the adapters'
/// transaction handles.
pub(crate) fn finish_commit<C>(
    commit: impl FnOnce() -> Result<(), C>,
    rollback: impl FnOnce() -> Result<(), C>,
) -> DbResult<()>
where
    C: std::fmt::Display,
{
    commit().map_err(|commit_err| {
        if let Err(rollback_err) = rollback() {
            log::warn!("ROLLBACK after failed COMMIT also failed: {rollback_err}");
        }
        DbError::TransactionError(format!("COMMIT failed: {commit_err}"))
    })
}

#[cfg(test)]
#[path = "traits_test.rs"]
mod tests;

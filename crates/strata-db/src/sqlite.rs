//! SQLite database backend implementation

use crate::backup::{BackupOptions, BackupProgress};
use crate::error::{DbError, DbResult};
use crate::history::{
    self, MigrationHistory, MigrationHistoryFind, MigrationHistoryStore, MigrationHistoryUpsert,
};
use crate::traits::{self, Database, Executor, SupportsOnlineBackup, Transaction};
use chrono::Utc;
use rusqlite::backup::{Backup, StepResult};
use rusqlite::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use strata_core::{Context, Profile};

/// Wait before retrying a backup step that hit a busy or locked source.
const LOCK_RETRY_PAUSE: Duration = Duration::from_millis(10);

/// Busy timeout for [`SqliteDatabase::in_memory`].
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite database backend
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
    /// File path; `None` for in-memory databases
    path: Option<PathBuf>,
    busy_timeout: Duration,
}

impl SqliteDatabase {
    /// Open (or create) a database file in WAL mode.
    pub fn open(path: &Path, busy_timeout: Duration) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        configure(&conn, busy_timeout)?;
        enable_wal(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
            busy_timeout,
        })
    }

    /// Create a private in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        Self::in_memory_with_timeout(DEFAULT_BUSY_TIMEOUT)
    }

    /// Create a private in-memory database with the given busy timeout.
    pub fn in_memory_with_timeout(busy_timeout: Duration) -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        configure(&conn, busy_timeout)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
            busy_timeout,
        })
    }

    /// Open the database named by `profile.dsn` (handles `:memory:`).
    pub fn from_profile(profile: &Profile) -> DbResult<Self> {
        let busy_timeout = Duration::from_millis(profile.busy_timeout_ms);
        if profile.is_memory() {
            Self::in_memory_with_timeout(busy_timeout)
        } else {
            Self::open(Path::new(&profile.dsn), busy_timeout)
        }
    }

    /// File path, or `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the underlying connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            DbError::ConnectionAcquisitionFailure(format!("sqlite connection mutex poisoned: {e}"))
        })
    }

    /// Open a second connection to the same file for the backup session.
    fn dedicated_connection(&self) -> DbResult<Connection> {
        let path = self.path.as_deref().ok_or_else(|| {
            DbError::ConnectionAcquisitionFailure(
                "in-memory sqlite database cannot open a dedicated connection".to_string(),
            )
        })?;
        let conn = Connection::open(path).map_err(|e| {
            DbError::ConnectionAcquisitionFailure(format!("{e}: {}", path.display()))
        })?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| DbError::ConnectionAcquisitionFailure(e.to_string()))?;
        Ok(conn)
    }
}

fn configure(conn: &Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.busy_timeout(busy_timeout)
        .map_err(|e| DbError::ConnectionError(format!("failed to set busy_timeout: {e}")))?;
    // Scripts rebuild tables in place; enforced foreign keys would reject that.
    conn.pragma_update(None, "foreign_keys", false)
        .map_err(|e| DbError::ConnectionError(format!("failed to disable foreign_keys: {e}")))?;
    Ok(())
}

fn enable_wal(conn: &Connection) -> DbResult<()> {
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| DbError::ConnectionError(format!("failed to enable WAL: {e}")))?;
    if !mode.eq_ignore_ascii_case("wal") {
        return Err(DbError::ConnectionError(format!(
            "journal_mode is '{mode}', expected 'wal'"
        )));
    }
    Ok(())
}

impl Executor for SqliteDatabase {
    fn db_type(&self) -> &'static str {
        "sqlite"
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        execute_batch(&*self.lock()?, sql)
    }

    fn execute(&self, sql: &str) -> DbResult<usize> {
        execute(&*self.lock()?, sql)
    }

    fn query_count(&self, sql: &str) -> DbResult<i64> {
        query_count(&*self.lock()?, sql)
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        relation_exists(&*self.lock()?, name)
    }
}

impl Database for SqliteDatabase {
    fn begin(&self) -> DbResult<Box<dyn Transaction + '_>> {
        let conn = self.lock()?;
        // Write lock is taken here, subject to busy_timeout.
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(Box::new(SqliteTransaction { conn, open: true }))
    }

    fn compact(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("VACUUM")
            .map_err(|e| DbError::CompactionFailure(e.to_string()))
    }

    fn online_backup(&self) -> Option<&dyn SupportsOnlineBackup> {
        Some(self)
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        let conn = self.conn.into_inner().map_err(|e| {
            DbError::ConnectionError(format!("sqlite connection mutex poisoned: {e}"))
        })?;
        conn.close()
            .map_err(|(_, e)| DbError::ConnectionError(format!("failed to close sqlite: {e}")))
    }
}

impl MigrationHistoryStore for SqliteDatabase {
    fn list_migration_history(
        &self,
        find: &MigrationHistoryFind,
    ) -> DbResult<Vec<MigrationHistory>> {
        list_history(&*self.lock()?, find)
    }

    fn upsert_migration_history(
        &self,
        upsert: &MigrationHistoryUpsert,
    ) -> DbResult<MigrationHistory> {
        upsert_history(&*self.lock()?, upsert)
    }
}

/// Transaction on a [`SqliteDatabase`], holding its connection lock.
pub struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl Executor for SqliteTransaction<'_> {
    fn db_type(&self) -> &'static str {
        "sqlite"
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        execute_batch(&self.conn, sql)
    }

    fn execute(&self, sql: &str) -> DbResult<usize> {
        execute(&self.conn, sql)
    }

    fn query_count(&self, sql: &str) -> DbResult<i64> {
        query_count(&self.conn, sql)
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        relation_exists(&self.conn, name)
    }
}

impl MigrationHistoryStore for SqliteTransaction<'_> {
    fn list_migration_history(
        &self,
        find: &MigrationHistoryFind,
    ) -> DbResult<Vec<MigrationHistory>> {
        list_history(&self.conn, find)
    }

    fn upsert_migration_history(
        &self,
        upsert: &MigrationHistoryUpsert,
    ) -> DbResult<MigrationHistory> {
        upsert_history(&self.conn, upsert)
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn commit(mut self: Box<Self>) -> DbResult<()> {
        self.open = false;
        traits::finish_commit(
            || self.conn.execute_batch("COMMIT"),
            || self.conn.execute_batch("ROLLBACK"),
        )
    }

    fn rollback(mut self: Box<Self>) -> DbResult<()> {
        self.open = false;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("ROLLBACK of abandoned sqlite transaction failed: {e}");
            }
        }
    }
}

fn execute_batch(conn: &Connection, sql: &str) -> DbResult<()> {
    conn.execute_batch(sql).map_err(|e| DbError::statement(sql, e))
}

fn execute(conn: &Connection, sql: &str) -> DbResult<usize> {
    conn.execute(sql, []).map_err(|e| DbError::statement(sql, e))
}

fn query_count(conn: &Connection, sql: &str) -> DbResult<i64> {
    let wrapped = format!("SELECT COUNT(*) FROM ({sql})");
    conn.query_row(&wrapped, [], |row| row.get(0))
        .map_err(|e| DbError::statement(sql, e))
}

fn relation_exists(conn: &Connection, name: &str) -> DbResult<bool> {
    let sql = "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1";
    let count: i64 = conn
        .query_row(sql, [name], |row| row.get(0))
        .map_err(|e| DbError::statement(sql, e))?;
    Ok(count > 0)
}

fn list_history(conn: &Connection, find: &MigrationHistoryFind) -> DbResult<Vec<MigrationHistory>> {
    let sql = history::list_sql(find);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| history::persistence_err("list migration history", e))?;
    let rows = stmt
        .query_map(params_from_iter(find.version.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| history::persistence_err("list migration history", e))?;
    history::to_records(rows)
}

fn upsert_history(conn: &Connection, upsert: &MigrationHistoryUpsert) -> DbResult<MigrationHistory> {
    let version = upsert.version.to_string();
    conn.execute(
        history::UPSERT_SQL,
        params![version, Utc::now().timestamp()],
    )
    .map_err(|e| history::persistence_err("upsert migration history", e))?;

    let rows = list_history(
        conn,
        &MigrationHistoryFind {
            version: Some(version),
        },
    )?;
    history::expect_one(rows, &upsert.version)
}

impl SupportsOnlineBackup for SqliteDatabase {
    fn backup_into(&self, ctx: &Context, dest: &Path, options: &BackupOptions) -> DbResult<()> {
        let src = self.dedicated_connection()?;
        let mut dst = Connection::open(dest).map_err(|e| {
            DbError::BackupSessionFailure(format!("failed to create {}: {e}", dest.display()))
        })?;

        {
            let backup = Backup::new(&src, &mut dst)
                .map_err(|e| DbError::BackupSessionFailure(format!("failed to start: {e}")))?;
            loop {
                ctx.check()?;
                let step = backup
                    .step(options.pages_per_step)
                    .map_err(|e| DbError::BackupSessionFailure(format!("step failed: {e}")))?;
                let progress = backup.progress();
                options.report(BackupProgress {
                    remaining: progress.remaining,
                    page_count: progress.pagecount,
                });
                match step {
                    StepResult::Done => break,
                    StepResult::More => {}
                    _ => std::thread::sleep(LOCK_RETRY_PAUSE),
                }
                if !options.step_pause.is_zero() {
                    std::thread::sleep(options.step_pause);
                }
            }
        }

        let integrity: String = dst
            .query_row("PRAGMA quick_check", [], |row| row.get(0))
            .map_err(|e| DbError::BackupSessionFailure(format!("quick_check failed: {e}")))?;
        if integrity != "ok" {
            return Err(DbError::BackupSessionFailure(format!(
                "quick_check reported: {integrity}"
            )));
        }

        dst.close().map_err(|(_, e)| {
            DbError::BackupSessionFailure(format!("failed to close {}: {e}", dest.display()))
        })?;
        if let Err((_, e)) = src.close() {
            log::warn!("Failed to close backup source connection: {e}");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;

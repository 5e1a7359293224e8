//! DuckDB database backend implementation

use crate::backup::{BackupOptions, BackupProgress};
use crate::error::{DbError, DbResult};
use crate::history::{
    self, MigrationHistory, MigrationHistoryFind, MigrationHistoryStore, MigrationHistoryUpsert,
};
use crate::traits::{self, Database, Executor, SupportsOnlineBackup, Transaction};
use chrono::Utc;
use duckdb::{params, Connection, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use strata_core::{Context, Profile};

/// Catalog alias the backup target is attached under.
const BACKUP_ALIAS: &str = "strata_backup";

/// DuckDB database backend
pub struct DuckDbDatabase {
    conn: Mutex<Connection>,
}

impl DuckDbDatabase {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the database named by `profile.dsn` (handles `:memory:`).
    pub fn from_profile(profile: &Profile) -> DbResult<Self> {
        if profile.is_memory() {
            Self::in_memory()
        } else {
            Self::open(Path::new(&profile.dsn))
        }
    }

    /// Run `f` against the underlying connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            DbError::ConnectionAcquisitionFailure(format!("duckdb connection mutex poisoned: {e}"))
        })
    }
}

impl Executor for DuckDbDatabase {
    fn db_type(&self) -> &'static str {
        "duckdb"
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

impl Database for DuckDbDatabase {
    fn begin(&self) -> DbResult<Box<dyn Transaction + '_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(Box::new(DuckDbTransaction { conn, open: true }))
    }

    fn compact(&self) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("CHECKPOINT")
            .map_err(|e| DbError::CompactionFailure(e.to_string()))
    }

    fn online_backup(&self) -> Option<&dyn SupportsOnlineBackup> {
        Some(self)
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        let conn = self.conn.into_inner().map_err(|e| {
            DbError::ConnectionError(format!("duckdb connection mutex poisoned: {e}"))
        })?;
        conn.close()
            .map_err(|(_, e)| DbError::ConnectionError(format!("failed to close duckdb: {e}")))
    }
}

impl MigrationHistoryStore for DuckDbDatabase {
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

/// Transaction on a [`DuckDbDatabase`], holding its connection lock.
pub struct DuckDbTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl Executor for DuckDbTransaction<'_> {
    fn db_type(&self) -> &'static str {
        "duckdb"
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

impl MigrationHistoryStore for DuckDbTransaction<'_> {
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

impl Transaction for DuckDbTransaction<'_> {
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

impl Drop for DuckDbTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("ROLLBACK of abandoned duckdb transaction failed: {e}");
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
    // Handle schema-qualified names
    let (schema, table) = match name.rsplit_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("main", name),
    };

    let sql = "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?";
    let count: i64 = conn
        .query_row(sql, params![schema, table], |row| row.get(0))
        .map_err(|e| DbError::statement(sql, e))?;
    Ok(count > 0)
}

fn list_history(conn: &Connection, find: &MigrationHistoryFind) -> DbResult<Vec<MigrationHistory>> {
    let sql = history::list_sql(find);
    let args: Vec<&dyn ToSql> = find.version.iter().map(|v| v as &dyn ToSql).collect();
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| history::persistence_err("list migration history", e))?;
    let rows = stmt
        .query_map(args.as_slice(), |row| {
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

/// Snapshot copy: the whole database is copied in one step on a cloned
/// connection, under the clone's own transaction snapshot.
impl SupportsOnlineBackup for DuckDbDatabase {
    fn backup_into(&self, ctx: &Context, dest: &Path, options: &BackupOptions) -> DbResult<()> {
        let snapshot = {
            let conn = self.lock()?;
            conn.try_clone()
                .map_err(|e| DbError::ConnectionAcquisitionFailure(e.to_string()))?
        };
        ctx.check()?;

        let source: String = snapshot
            .query_row("SELECT current_database()", [], |row| row.get(0))
            .map_err(|e| DbError::BackupSessionFailure(format!("failed to read catalog: {e}")))?;
        let target = dest.display().to_string().replace('\'', "''");
        let attach = format!("ATTACH '{target}' AS {BACKUP_ALIAS}");
        let copy = format!(
            "COPY FROM DATABASE \"{}\" TO {BACKUP_ALIAS}",
            source.replace('"', "\"\"")
        );
        let detach = format!("DETACH {BACKUP_ALIAS}");

        snapshot
            .execute_batch(&attach)
            .map_err(|e| DbError::BackupSessionFailure(format!("{attach}: {e}")))?;
        let copied = snapshot.execute_batch(&copy);
        let detached = snapshot.execute_batch(&detach);
        copied.map_err(|e| DbError::BackupSessionFailure(format!("{copy}: {e}")))?;
        detached.map_err(|e| DbError::BackupSessionFailure(format!("{detach}: {e}")))?;

        options.report(BackupProgress {
            remaining: 0,
            page_count: 1,
        });
        if let Err((_, e)) = snapshot.close() {
            log::warn!("Failed to close backup connection: {e}");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;

use super::*;
use crate::history::{MigrationHistory, MigrationHistoryFind, MigrationHistoryUpsert};
use crate::sqlite::SqliteDatabase;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

fn table() -> SqliteDatabase {
    let db = SqliteDatabase::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
    db
}

#[test]
fn test_with_transaction_commits() {
    let db = table();
    let inserted = with_transaction(&db, |db| db.execute("INSERT INTO t VALUES (1), (2)")).unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 2);
}

#[test]
fn test_with_transaction_rolls_back_on_error() {
    let db = table();
    let result: Result<(), DbError> = with_transaction(&db, |db| {
        db.execute("INSERT INTO t VALUES (1)")?;
        db.execute("INSERT INTO missing VALUES (1)")?;
        Ok(())
    });
    assert!(matches!(
        result,
        Err(DbError::StatementExecutionFailure { .. })
    ));
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 0);
}

#[test]
fn test_other_writers_wait_for_transaction_to_end() {
    let db = Arc::new(table());
    let (started, writer_started) = mpsc::channel();
    let mut writer = None;

    let result: Result<(), DbError> = with_transaction(&*db, |tx| {
        tx.execute("INSERT INTO t VALUES (1)")?;
        let shared = Arc::clone(&db);
        writer = Some(thread::spawn(move || {
            started.send(()).unwrap();
            shared.execute("INSERT INTO t VALUES (2)")
        }));
        writer_started.recv().unwrap();
        thread::sleep(Duration::from_millis(50));
        Err(DbError::TransactionError("maintenance aborted".to_string()))
    });
    assert!(result.is_err());

    let inserted = writer.unwrap().join().unwrap().unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(db.query_count("SELECT * FROM t").unwrap(), 1);
    assert_eq!(db.query_count("SELECT * FROM t WHERE x = 2").unwrap(), 1);
}

#[test]
fn test_default_online_backup_is_none() {
    let db = NoBackup(SqliteDatabase::in_memory().unwrap());
    assert!(db.online_backup().is_none());

    let dir = tempfile::tempdir().unwrap();
    let err = crate::backup::backup_to(
        &Context::background(),
        &db,
        &dir.path().join("out.db"),
        &BackupOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, DbError::BackupUnsupported { .. }));
}

/// SQLite adapter without the backup capability.
struct NoBackup(SqliteDatabase);

impl MigrationHistoryStore for NoBackup {
    fn list_migration_history(&self, find: &MigrationHistoryFind) -> DbResult<Vec<MigrationHistory>> {
        self.0.list_migration_history(find)
    }
    fn upsert_migration_history(&self, upsert: &MigrationHistoryUpsert) -> DbResult<MigrationHistory> {
        self.0.upsert_migration_history(upsert)
    }
}

impl Executor for NoBackup {
    fn db_type(&self) -> &'static str {
        "nobackup"
    }
    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.0.execute_batch(sql)
    }
    fn execute(&self, sql: &str) -> DbResult<usize> {
        self.0.execute(sql)
    }
    fn query_count(&self, sql: &str) -> DbResult<i64> {
        self.0.query_count(sql)
    }
    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.0.relation_exists(name)
    }
}

impl Database for NoBackup {
    fn begin(&self) -> DbResult<Box<dyn Transaction + '_>> {
        self.0.begin()
    }
    fn compact(&self) -> DbResult<()> {
        self.0.compact()
    }
    fn close(self: Box<Self>) -> DbResult<()> {
        Box::new(self.0).close()
    }
}

//! strata-db - Storage adapters for Strata
//!
//! This crate provides the [`Database`] trait the migration engine runs
//! against, SQLite and DuckDB implementations, the persisted migration
//! history, the online [`backup`] engine, and the orphan-row [`vacuum`].

pub mod backup;
pub mod duckdb;
pub mod error;
pub mod history;
pub mod sqlite;
pub mod traits;
pub mod vacuum;

pub use backup::{backup_to, BackupOptions, BackupProgress};
pub use self::duckdb::{DuckDbDatabase, DuckDbTransaction};
pub use error::{DbError, DbResult};
pub use history::{
    MigrationHistory, MigrationHistoryFind, MigrationHistoryStore, MigrationHistoryUpsert,
    MIGRATION_HISTORY_TABLE,
};
pub use sqlite::{SqliteDatabase, SqliteTransaction};
pub use traits::{with_transaction, Database, Executor, SupportsOnlineBackup, Transaction};
pub use vacuum::{vacuum, OrphanRule, VacuumReport, DEFAULT_ORPHAN_RULES};

use strata_core::{Driver, Profile};

/// Open the adapter selected by `profile.driver`.
///
/// The returned adapter fixes the backup strategy: SQLite copies pages
/// stepwise, DuckDB copies a snapshot.
pub fn open_database(profile: &Profile) -> DbResult<Box<dyn Database>> {
    profile.validate()?;
    let db: Box<dyn Database> = match profile.driver {
        Driver::Sqlite => Box::new(SqliteDatabase::from_profile(profile)?),
        Driver::DuckDb => Box::new(DuckDbDatabase::from_profile(profile)?),
    };
    log::debug!("Opened {} database at {}", db.db_type(), profile.dsn);
    Ok(db)
}

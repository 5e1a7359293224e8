//! The store handle an application holds for its lifetime.

use crate::error::StoreResult;
use crate::migrator::{MigrationOutcome, Migrator};
use crate::observer::{LogObserver, MigrationObserver};
use std::path::Path;
use std::sync::Arc;
use strata_catalog::{Dialect, ScriptCatalog};
use strata_core::{Context, Profile};
use strata_db::{
    backup_to, open_database, vacuum, BackupOptions, Database, MigrationHistory,
    MigrationHistoryFind, OrphanRule, VacuumReport, DEFAULT_ORPHAN_RULES,
};

/// Database adapter plus the script catalog of its dialect.
pub struct Store {
    profile: Profile,
    db: Box<dyn Database>,
    catalog: ScriptCatalog,
    observer: Arc<dyn MigrationObserver>,
    orphan_rules: Vec<OrphanRule>,
    backup_options: BackupOptions,
}

impl Store {
    /// Open the database `profile` names, with the bundled scripts for its
    /// driver.
    pub fn open(profile: Profile) -> StoreResult<Self> {
        let db = open_database(&profile)?;
        let catalog = ScriptCatalog::embedded(Dialect::from(profile.driver))?;
        Ok(Self::from_parts(profile, db, catalog))
    }

    /// Assemble a store from an already-open adapter and any catalog.
    pub fn from_parts(profile: Profile, db: Box<dyn Database>, catalog: ScriptCatalog) -> Self {
        Self {
            profile,
            db,
            catalog,
            observer: Arc::new(LogObserver),
            orphan_rules: DEFAULT_ORPHAN_RULES.to_vec(),
            backup_options: BackupOptions::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn MigrationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the orphan rules [`Store::vacuum`] runs.
    pub fn with_orphan_rules(mut self, rules: Vec<OrphanRule>) -> Self {
        self.orphan_rules = rules;
        self
    }

    pub fn with_backup_options(mut self, options: BackupOptions) -> Self {
        self.backup_options = options;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn db(&self) -> &dyn Database {
        self.db.as_ref()
    }

    pub fn catalog(&self) -> &ScriptCatalog {
        &self.catalog
    }

    /// See [`Migrator::migrate`].
    pub fn migrate(&self, ctx: &Context) -> StoreResult<MigrationOutcome> {
        Migrator::new(self.db.as_ref(), &self.catalog, &self.profile)
            .with_observer(Arc::clone(&self.observer))
            .migrate(ctx)
    }

    /// Write a consistent copy of the live database to `path`.
    pub fn backup_to(&self, ctx: &Context, path: &Path) -> StoreResult<()> {
        backup_to(ctx, self.db.as_ref(), path, &self.backup_options)?;
        Ok(())
    }

    /// Delete orphaned rows, then compact the database file.
    pub fn vacuum(&self, ctx: &Context) -> StoreResult<VacuumReport> {
        Ok(vacuum(ctx, self.db.as_ref(), &self.orphan_rules)?)
    }

    /// All recorded versions, oldest first.
    pub fn list_migration_history(&self) -> StoreResult<Vec<MigrationHistory>> {
        Ok(self
            .db
            .list_migration_history(&MigrationHistoryFind::default())?)
    }

    /// Release the connection.
    pub fn close(self) -> StoreResult<()> {
        self.db.close()?;
        Ok(())
    }
}

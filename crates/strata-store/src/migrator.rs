//! Version-ordered migration engine.
//!
//! Dev and demo profiles rebuild the schema from the dev snapshot. Prod
//! profiles bootstrap an empty database from the prod snapshot, then apply
//! every `migration/prod/<major>.<minor>` bucket between the latest
//! recorded version and the application version, recording each bucket in
//! `migration_history` as it completes.

use crate::error::{StoreError, StoreResult};
use crate::observer::{LogObserver, MigrationObserver};
use crate::seed::{run_script, SeedLoader};
use std::sync::Arc;
use strata_catalog::{SchemaKind, ScriptBucket, ScriptCatalog};
use strata_core::{version, Context, Profile, Version};
use strata_db::{
    with_transaction, Database, Executor, MigrationHistoryFind, MigrationHistoryUpsert,
    MIGRATION_HISTORY_TABLE,
};

/// What a [`Migrator::migrate`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Dev schema applied; `seeded` when demo data was loaded
    DevBootstrap { seeded: bool },
    /// Empty prod database created at `version`
    ProdBootstrap { version: Version },
    /// Buckets applied, in order; empty when none fell in range
    Incremental { applied: Vec<Version> },
    /// Nothing to do; `latest` is the latest recorded version
    UpToDate { latest: Version },
}

pub struct Migrator<'a> {
    db: &'a dyn Database,
    catalog: &'a ScriptCatalog,
    profile: &'a Profile,
    observer: Arc<dyn MigrationObserver>,
}

impl<'a> Migrator<'a> {
    pub fn new(db: &'a dyn Database, catalog: &'a ScriptCatalog, profile: &'a Profile) -> Self {
        Self {
            db,
            catalog,
            profile,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn MigrationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Bring the database up to the profile's application version.
    ///
    /// History is re-read on every call. A failed call leaves every bucket
    /// recorded before the failure in place, so calling again resumes.
    pub fn migrate(&self, ctx: &Context) -> StoreResult<MigrationOutcome> {
        ctx.check()?;
        if self.profile.is_dev() {
            return self.dev_bootstrap(ctx);
        }

        let current = self.profile.current_version()?;
        let latest = if self.db.relation_exists(MIGRATION_HISTORY_TABLE)? {
            let history = self
                .db
                .list_migration_history(&MigrationHistoryFind::default())?;
            version::latest(history.iter().map(|h| h.version.as_str()))?
        } else {
            None
        };

        let Some(latest) = latest else {
            return self.prod_bootstrap(ctx, current);
        };

        // Only major.minor counts: a patch release never carries schema changes.
        if current.schema_version() <= latest {
            log::debug!("Schema up to date at {latest} (application {current})");
            return Ok(MigrationOutcome::UpToDate { latest });
        }

        self.observer.on_migration_start(latest, current);
        let mut applied = Vec::new();
        for bucket in self.catalog.minor_buckets() {
            let target = bucket.version();
            if target > latest && current >= target {
                self.apply_bucket(ctx, bucket)?;
                applied.push(target);
            }
        }
        self.observer.on_migration_done(&applied);
        Ok(MigrationOutcome::Incremental { applied })
    }

    fn dev_bootstrap(&self, ctx: &Context) -> StoreResult<MigrationOutcome> {
        let fresh = !self.db.relation_exists(MIGRATION_HISTORY_TABLE)?;
        let script = self.catalog.latest_full_schema(SchemaKind::Dev)?;

        self.observer.on_bootstrap_start(SchemaKind::Dev);
        run_script(ctx, self.db, &script, |script, source| StoreError::Bootstrap {
            kind: SchemaKind::Dev,
            script,
            source,
        })?;
        self.observer.on_bootstrap_done(SchemaKind::Dev);

        let seeded = self.profile.is_demo() && fresh;
        if seeded {
            SeedLoader::new(self.db, self.catalog).seed(ctx)?;
        } else if self.profile.is_demo() {
            log::info!("Database already initialized, skipping demo seed");
        }
        Ok(MigrationOutcome::DevBootstrap { seeded })
    }

    fn prod_bootstrap(&self, ctx: &Context, current: Version) -> StoreResult<MigrationOutcome> {
        let script = self.catalog.latest_full_schema(SchemaKind::Prod)?;

        self.observer.on_bootstrap_start(SchemaKind::Prod);
        with_transaction(self.db, |tx| {
            run_script(ctx, tx, &script, |script, source| StoreError::Bootstrap {
                kind: SchemaKind::Prod,
                script,
                source,
            })?;
            record(tx, current)
        })?;
        self.observer.on_bootstrap_done(SchemaKind::Prod);

        Ok(MigrationOutcome::ProdBootstrap { version: current })
    }

    /// Run every script of `bucket` and record its version, all in one
    /// transaction.
    fn apply_bucket(&self, ctx: &Context, bucket: &ScriptBucket) -> StoreResult<()> {
        let target = bucket.version();
        let scripts = self.catalog.scripts_for(bucket.minor_key())?;

        self.observer.on_bucket_start(target);
        with_transaction(self.db, |tx| {
            for script in &scripts {
                run_script(ctx, tx, script, |script, source| StoreError::Bucket {
                    version: target,
                    script,
                    source,
                })?;
            }
            record(tx, target)
        })?;
        self.observer.on_bucket_done(target);
        Ok(())
    }
}

fn record<X: Executor + ?Sized>(db: &X, version: Version) -> StoreResult<()> {
    db.upsert_migration_history(&MigrationHistoryUpsert { version })
        .map_err(|source| StoreError::Record { version, source })?;
    Ok(())
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;

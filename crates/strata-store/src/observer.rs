//! Progress hooks for the migration engine.

use strata_catalog::SchemaKind;
use strata_core::Version;

/// Receives migration progress. Every hook defaults to doing nothing.
pub trait MigrationObserver: Send + Sync {
    fn on_bootstrap_start(&self, _kind: SchemaKind) {}

    fn on_bootstrap_done(&self, _kind: SchemaKind) {}

    /// Incremental migration from the latest recorded version to `to`.
    fn on_migration_start(&self, _from: Version, _to: Version) {}

    fn on_bucket_start(&self, _version: Version) {}

    fn on_bucket_done(&self, _version: Version) {}

    fn on_migration_done(&self, _applied: &[Version]) {}
}

/// Observer that writes progress to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl MigrationObserver for LogObserver {
    fn on_bootstrap_start(&self, kind: SchemaKind) {
        log::info!("Bootstrapping {kind} schema");
    }

    fn on_bootstrap_done(&self, kind: SchemaKind) {
        log::info!("Bootstrapped {kind} schema");
    }

    fn on_migration_start(&self, from: Version, to: Version) {
        log::info!("Migrating schema from {from} to {to}");
    }

    fn on_bucket_start(&self, version: Version) {
        log::info!("Applying migration for {version}");
    }

    fn on_bucket_done(&self, version: Version) {
        log::debug!("Recorded migration {version}");
    }

    fn on_migration_done(&self, applied: &[Version]) {
        log::info!("Migration finished, {} buckets applied", applied.len());
    }
}

//! Demo data loader.

use crate::error::{StoreError, StoreResult};
use strata_catalog::{Script, ScriptCatalog};
use strata_core::Context;
use strata_db::{Database, DbError, Executor};

/// Runs the catalog's seed scripts.
///
/// Seeding is not idempotent; the migrator calls it once, right after a
/// fresh dev bootstrap.
pub struct SeedLoader<'a> {
    db: &'a dyn Database,
    catalog: &'a ScriptCatalog,
}

impl<'a> SeedLoader<'a> {
    pub fn new(db: &'a dyn Database, catalog: &'a ScriptCatalog) -> Self {
        Self { db, catalog }
    }

    /// Execute every seed statement in file order; returns the count.
    pub fn seed(&self, ctx: &Context) -> StoreResult<usize> {
        let scripts = self.catalog.seed_scripts()?;
        let mut executed = 0;
        for script in &scripts {
            executed += run_script(ctx, self.db, script, |script, source| StoreError::Seed {
                script,
                source,
            })?;
        }
        log::info!(
            "Seeded {} database: {} scripts, {executed} statements",
            self.db.db_type(),
            scripts.len()
        );
        Ok(executed)
    }
}

/// Execute the statements of `script` one at a time, checking `ctx` before
/// each. `wrap` attaches script context to a statement failure.
///
/// `db` is either the shared database or an open transaction on it.
pub(crate) fn run_script<X, F>(
    ctx: &Context,
    db: &X,
    script: &Script,
    wrap: F,
) -> StoreResult<usize>
where
    X: Executor + ?Sized,
    F: Fn(String, DbError) -> StoreError,
{
    let statements = script.statements();
    for statement in &statements {
        ctx.check()?;
        db.execute_batch(statement)
            .map_err(|source| wrap(script.path.clone(), source))?;
    }
    log::debug!("Executed {} ({} statements)", script.path, statements.len());
    Ok(statements.len())
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;

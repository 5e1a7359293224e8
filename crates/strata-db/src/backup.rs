//! Online backup of a live database into a file.
//!
//! The copy is written to a staging file next to the target and renamed onto
//! the target only once the adapter reports a complete, verified copy. A
//! failed backup leaves the target untouched.

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use strata_core::Context;

/// Copy all remaining pages in a single step.
pub const ALL_PAGES: i32 = -1;

/// Progress after one copy step, in pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupProgress {
    pub remaining: i32,
    pub page_count: i32,
}

/// Callback invoked after every copy step.
pub type ProgressFn = Arc<dyn Fn(BackupProgress) + Send + Sync>;

/// Tuning for the stepwise copy.
#[derive(Clone)]
pub struct BackupOptions {
    /// Pages copied per step; [`ALL_PAGES`] copies everything at once
    pub pages_per_step: i32,

    /// Pause between steps, giving writers a chance to take the lock
    pub step_pause: Duration,

    pub progress: Option<ProgressFn>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            pages_per_step: ALL_PAGES,
            step_pause: Duration::ZERO,
            progress: None,
        }
    }
}

impl fmt::Debug for BackupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupOptions")
            .field("pages_per_step", &self.pages_per_step)
            .field("step_pause", &self.step_pause)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BackupOptions {
    /// Copy `pages` pages per step, pausing `pause` in between.
    pub fn stepwise(pages: i32, pause: Duration) -> Self {
        Self {
            pages_per_step: pages,
            step_pause: pause,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub(crate) fn report(&self, progress: BackupProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

/// Write a consistent copy of `db` to `target`, replacing any existing file.
pub fn backup_to(
    ctx: &Context,
    db: &dyn Database,
    target: &Path,
    options: &BackupOptions,
) -> DbResult<()> {
    ctx.check()?;
    let backend = db
        .online_backup()
        .ok_or_else(|| DbError::BackupUnsupported {
            backend: db.db_type().to_string(),
        })?;
    if options.pages_per_step == 0 || options.pages_per_step < ALL_PAGES {
        return Err(DbError::BackupSessionFailure(format!(
            "pages_per_step must be positive or {ALL_PAGES}, got {}",
            options.pages_per_step
        )));
    }

    let staging = staging_path(target);
    discard(&staging);
    log::info!(
        "Backing up {} database to {}",
        db.db_type(),
        target.display()
    );

    if let Err(err) = backend.backup_into(ctx, &staging, options) {
        discard(&staging);
        return Err(err);
    }

    if let Err(err) = std::fs::rename(&staging, target) {
        discard(&staging);
        return Err(DbError::Io {
            path: target.display().to_string(),
            source: err,
        });
    }

    log::info!("Backup written to {}", target.display());
    Ok(())
}

/// `<target>.tmp-<pid>`, in the same directory so the final rename stays on
/// one filesystem.
pub(crate) fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(format!(".tmp-{}", std::process::id()));
    PathBuf::from(name)
}

/// Remove a staging file and any journal files the engines left beside it.
fn discard(staging: &Path) {
    for suffix in ["", "-wal", "-shm", "-journal", ".wal"] {
        let mut name = staging.as_os_str().to_os_string();
        name.push(suffix);
        let path = PathBuf::from(name);
        if path.exists() {
            if let Err(err) = std::fs::remove_file(&path) {
                log::warn!("Failed to remove {}: {err}", path.display());
            }
        }
    }
}

#[cfg(test)]
#[path = "backup_test.rs"]
mod tests;

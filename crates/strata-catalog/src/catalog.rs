//! Read-only catalog of migration, schema, and seed scripts.

use crate::embedded::Dialect;
use crate::error::{CatalogError, CatalogResult};
use crate::split::split_statements;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use strata_core::Version;

/// File name of the full "create everything" schema snapshot.
pub const LATEST_SCHEMA_FILE_NAME: &str = "LATEST__SCHEMA.sql";

/// Root of the incremental bucket directories.
pub const PROD_MIGRATION_ROOT: &str = "migration/prod";

/// Root of the seed scripts.
pub const SEED_ROOT: &str = "seed";

/// Which full-schema snapshot to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Dev,
    Prod,
}

impl SchemaKind {
    fn dir(self) -> &'static str {
        match self {
            SchemaKind::Dev => "dev",
            SchemaKind::Prod => "prod",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// One script file, decoded as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Path relative to the catalog root, `/`-separated
    pub path: String,
    /// Full file content
    pub content: String,
}

impl Script {
    /// Non-empty statements in file order.
    pub fn statements(&self) -> Vec<&str> {
        split_statements(&self.content)
    }
}

/// Incremental scripts for one minor version.
#[derive(Debug, Clone)]
pub struct ScriptBucket {
    minor_key: String,
    version: Version,
    scripts: Vec<String>,
}

impl ScriptBucket {
    /// Directory name, e.g. `0.12`.
    pub fn minor_key(&self) -> &str {
        &self.minor_key
    }

    /// `major.minor.0`, the version recorded once the bucket is applied.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Script paths, sorted by file name.
    pub fn script_paths(&self) -> &[String] {
        &self.scripts
    }
}

/// Immutable script bundle.
///
/// Buckets are resolved once, at construction; nothing can add, remove, or
/// rewrite files afterwards.
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    files: BTreeMap<String, Cow<'static, [u8]>>,
    buckets: Vec<ScriptBucket>,
}

impl ScriptCatalog {
    /// Catalog compiled into the binary for `dialect`.
    pub fn embedded(dialect: Dialect) -> CatalogResult<Self> {
        Self::from_files(dialect.files()?)
    }

    /// Build a catalog from `(relative path, content)` pairs.
    pub fn from_files<I, P, B>(files: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = (P, B)>,
        P: AsRef<str>,
        B: Into<Cow<'static, [u8]>>,
    {
        let files: BTreeMap<String, Cow<'static, [u8]>> = files
            .into_iter()
            .map(|(path, content)| (normalize_path(path.as_ref()), content.into()))
            .collect();
        let buckets = discover_buckets(&files)?;
        log::debug!(
            "Script catalog loaded: {} files, {} migration buckets",
            files.len(),
            buckets.len()
        );
        Ok(Self { files, buckets })
    }

    /// The canonical full schema for `kind`.
    pub fn latest_full_schema(&self, kind: SchemaKind) -> CatalogResult<Script> {
        self.read(&format!("migration/{}/{}", kind.dir(), LATEST_SCHEMA_FILE_NAME))
    }

    /// Buckets in ascending version order.
    pub fn minor_buckets(&self) -> &[ScriptBucket] {
        &self.buckets
    }

    /// Minor keys in ascending version order.
    pub fn minor_keys(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.minor_key()).collect()
    }

    /// Scripts of one bucket, sorted by file name.
    pub fn scripts_for(&self, minor_key: &str) -> CatalogResult<Vec<Script>> {
        let bucket = self
            .buckets
            .iter()
            .find(|b| b.minor_key == minor_key)
            .ok_or_else(|| CatalogError::UnknownBucket {
                minor_key: minor_key.to_string(),
            })?;
        bucket.scripts.iter().map(|path| self.read(path)).collect()
    }

    /// Seed scripts, sorted by file name.
    pub fn seed_scripts(&self) -> CatalogResult<Vec<Script>> {
        self.files
            .keys()
            .filter(|path| is_direct_sql_child(path, SEED_ROOT))
            .map(|path| self.read(path))
            .collect()
    }

    /// Read one file by catalog-relative path.
    pub fn read(&self, path: &str) -> CatalogResult<Script> {
        let bytes = self
            .files
            .get(path)
            .ok_or_else(|| CatalogError::ScriptReadFailure {
                path: path.to_string(),
                reason: "not found in catalog".to_string(),
            })?;
        let content = std::str::from_utf8(bytes).map_err(|e| CatalogError::ScriptReadFailure {
            path: path.to_string(),
            reason: format!("invalid UTF-8: {e}"),
        })?;
        Ok(Script {
            path: path.to_string(),
            content: content.to_string(),
        })
    }
}

fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    unified
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

/// `root/<name>.sql`, with no deeper nesting.
fn is_direct_sql_child(path: &str, root: &str) -> bool {
    path.strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.contains('/') && name.ends_with(".sql"))
}

/// Group `migration/prod/<major>.<minor>/*.sql` files into buckets.
///
/// A directory counts as a bucket as soon as it holds any file; only its
/// direct `.sql` children are scripts. BTreeMap iteration already yields
/// paths sorted, so each bucket's scripts come out in file-name order.
fn discover_buckets(
    files: &BTreeMap<String, Cow<'static, [u8]>>,
) -> CatalogResult<Vec<ScriptBucket>> {
    let mut by_dir: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for path in files.keys() {
        let Some(rest) = path
            .strip_prefix(PROD_MIGRATION_ROOT)
            .and_then(|r| r.strip_prefix('/'))
        else {
            continue;
        };
        let Some((dir, file)) = rest.split_once('/') else {
            continue;
        };
        if !Version::is_minor_key(dir) {
            continue;
        }
        let scripts = by_dir.entry(dir).or_default();
        if !file.contains('/') && file.ends_with(".sql") {
            scripts.push(path.clone());
        }
    }

    let mut buckets = by_dir
        .into_iter()
        .map(|(dir, scripts)| {
            Ok(ScriptBucket {
                minor_key: dir.to_string(),
                version: Version::parse_minor_key(dir)?,
                scripts,
            })
        })
        .collect::<CatalogResult<Vec<_>>>()?;
    buckets.sort_by(|a, b| a.version.cmp(&b.version));

    for pair in buckets.windows(2) {
        if pair[0].version == pair[1].version {
            return Err(CatalogError::DuplicateBucket {
                version: pair[0].version.to_string(),
                first: pair[0].minor_key.clone(),
                second: pair[1].minor_key.clone(),
            });
        }
    }
    Ok(buckets)
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;

//! Script trees compiled into the binary.

use crate::error::{CatalogError, CatalogResult};
use rust_embed::Embed;
use std::borrow::Cow;
use std::fmt;
use strata_core::Driver;

/// SQLite script tree
#[derive(Embed)]
#[folder = "scripts/sqlite/"]
struct SqliteScripts;

/// DuckDB script tree
#[derive(Embed)]
#[folder = "scripts/duckdb/"]
struct DuckDbScripts;

/// SQL dialect of an embedded script tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    DuckDb,
}

impl Dialect {
    /// All files of this dialect's tree as `(relative path, content)`.
    pub(crate) fn files(self) -> CatalogResult<Vec<(String, Cow<'static, [u8]>)>> {
        match self {
            Dialect::Sqlite => collect::<SqliteScripts>(),
            Dialect::DuckDb => collect::<DuckDbScripts>(),
        }
    }
}

fn collect<E: Embed>() -> CatalogResult<Vec<(String, Cow<'static, [u8]>)>> {
    E::iter()
        .map(|path| {
            let file = E::get(&path).ok_or_else(|| CatalogError::ScriptReadFailure {
                path: path.to_string(),
                reason: "listed but not embedded".to_string(),
            })?;
            Ok((path.into_owned(), file.data))
        })
        .collect()
}

impl From<Driver> for Dialect {
    fn from(driver: Driver) -> Self {
        match driver {
            Driver::Sqlite => Dialect::Sqlite,
            Driver::DuckDb => Dialect::DuckDb,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::DuckDb => write!(f, "duckdb"),
        }
    }
}

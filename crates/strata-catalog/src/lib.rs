//! strata-catalog - Embedded SQL scripts for Strata
//!
//! The catalog is an immutable bundle of `.sql` files laid out as:
//!
//! ```text
//! migration/dev/LATEST__SCHEMA.sql
//! migration/prod/LATEST__SCHEMA.sql
//! migration/prod/<major>.<minor>/*.sql
//! seed/*.sql
//! ```
//!
//! One tree per [`Dialect`] is compiled into the binary; tests and callers
//! with their own scripts can build a catalog from any file listing.

pub mod catalog;
pub mod embedded;
pub mod error;
pub mod split;

pub use catalog::{SchemaKind, Script, ScriptBucket, ScriptCatalog};
pub use embedded::Dialect;
pub use error::{CatalogError, CatalogResult};
pub use split::split_statements;

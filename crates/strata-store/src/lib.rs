//! strata-store - Schema migration and maintenance for Strata
//!
//! This crate ties the script catalog to a database adapter. The
//! [`Migrator`] brings a database up to the application version, the
//! [`SeedLoader`] fills a fresh demo database, and [`Store`] bundles both
//! with backup and vacuum behind one handle.

pub mod error;
pub mod migrator;
pub mod observer;
pub mod seed;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use migrator::{MigrationOutcome, Migrator};
pub use observer::{LogObserver, MigrationObserver};
pub use seed::SeedLoader;
pub use store::Store;

//! strata-core - Core library for Strata
//!
//! This crate provides the pieces shared by every other Strata component:
//! dotted version parsing and ordering, the [`Profile`] that describes which
//! database to open and in which mode, and the cooperative cancellation
//! [`Context`] checked between statements.

pub mod context;
pub mod error;
pub mod profile;
pub mod version;

pub use context::Context;
pub use error::{CoreError, CoreResult};
pub use profile::{Driver, Mode, Profile};
pub use version::{Version, APP_VERSION};

//! # migrate-driver: Driver contract for schema migrations
//!
//! The pieces a migration runner and a database driver agree on:
//! the [`Driver`] trait, [`MigrationFile`] with its version and
//! [`Direction`], and the [`DriverRegistry`] that maps URL schemes to
//! driver factories.

pub mod driver;
pub mod error;
pub mod file;
pub mod registry;

pub use driver::*;
pub use error::*;
pub use file::*;
pub use registry::*;

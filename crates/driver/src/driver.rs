//! Core Driver Traits
//!
//! A migration runner talks to a database exclusively through these traits.
//! A [`DriverFactory`] turns a connection URL into an open [`Driver`]; the
//! driver then records versions and applies migration files.

use async_trait::async_trait;

use crate::error::DriverResult;
use crate::file::{MigrationFile, Version, Versions};

/// An open connection to a migration target
#[async_trait]
pub trait Driver: Send + Sync {
    /// Release the underlying session
    async fn close(self: Box<Self>) -> DriverResult<()>;

    /// Apply (or revert, for down files) a single migration file
    async fn migrate(&self, file: &mut MigrationFile) -> DriverResult<()>;

    /// Latest applied version, `0` when nothing has been applied
    async fn version(&self) -> DriverResult<Version> {
        let versions = self.versions().await?;
        Ok(versions.first().copied().unwrap_or(0))
    }

    /// All applied versions, most recent first
    async fn versions(&self) -> DriverResult<Versions>;

    /// Execute a raw statement
    async fn execute(&self, statement: &str) -> DriverResult<()>;
}

/// Opens drivers from connection URLs
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self, url: &str) -> DriverResult<Box<dyn Driver>>;
}

//! Session Abstractions
//!
//! The driver only needs three things from a cluster session: run a
//! statement, scan a `bigint` column and let go of the connection.
//! [`ScyllaSession`] talks to a real cluster through the `scylla` client;
//! [`MemorySession`] keeps everything in process.

pub mod cluster;
pub mod memory;

pub use cluster::ScyllaSession;
pub use memory::MemorySession;

use async_trait::async_trait;
use migrate_driver::{DriverResult, Versions};

/// Abstract CQL session trait
#[async_trait]
pub trait CqlSession: Send + Sync {
    /// Execute one statement, binding `values` to its markers in order
    async fn execute(&self, cql: &str, values: &[i64]) -> DriverResult<()>;

    /// Read the first column of every row returned by `cql` as a version.
    ///
    /// A failure part way through the scan is reported as
    /// [`migrate_driver::DriverError::VersionScan`] carrying the rows read so far.
    async fn query_versions(&self, cql: &str) -> DriverResult<Versions>;

    /// Close the session
    ///
    /// Sessions are shared behind `Arc`, so this cannot take ownership. For
    /// [`ScyllaSession`] the cluster connections are released only when the
    /// last `Arc` holding it is dropped: a caller that kept its own clone
    /// keeps them open after the driver is closed.
    async fn close(&self) -> DriverResult<()>;
}

//! # migrate-cassandra: Cassandra driver for schema migrations
//!
//! Applies versioned `.cql` migration files to a Cassandra or ScyllaDB
//! cluster and records applied versions in a `schema_migrations` table.
//!
//! ```no_run
//! use migrate_driver::{Direction, Driver, DriverRegistry, MigrationFile};
//!
//! # async fn run() -> migrate_driver::DriverResult<()> {
//! let mut registry = DriverRegistry::new();
//! migrate_cassandra::register(&mut registry);
//!
//! let driver = registry
//!     .open("cassandra://localhost:9042/app?consistency=quorum")
//!     .await?;
//!
//! let mut file = MigrationFile::new(
//!     20240101,
//!     "create_users",
//!     Direction::Up,
//!     "CREATE TABLE users (id uuid PRIMARY KEY, email text);",
//! );
//! driver.migrate(&mut file).await?;
//! assert_eq!(driver.version().await?, 20240101);
//!
//! driver.close().await
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod session;
pub mod splitter;

pub use config::{ClusterConfig, ConsistencyLevel, Credentials, TlsOptions, UrlError};
pub use driver::{register, CassandraDriver, CassandraDriverFactory, SCHEMES, VERSION_TABLE};
pub use session::{CqlSession, MemorySession, ScyllaSession};
pub use splitter::{SemicolonSplitter, StatementSplitter};

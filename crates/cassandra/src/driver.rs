//! Cassandra Driver
//!
//! Applies migration files against a cluster session and keeps the
//! `schema_migrations` table in step.
//!
//! Applying a file moves through these stages:
//!
//! ```text
//! Idle -> ContentLoaded -> BookkeepingWritten -> StatementsExecuting
//!      -> Committed
//!      -> CompensatingDelete -> Failed
//! ```
//!
//! An up file records its version before its statements run, a down file
//! removes it. When anything after loading the content fails, the version row
//! is deleted again (whatever the direction) so the runner does not treat the
//! file as applied. Statements that already ran are not undone.

use std::sync::Arc;

use async_trait::async_trait;
use migrate_driver::{
    Direction, Driver, DriverError, DriverFactory, DriverRegistry, DriverResult, MigrationFile,
    Version, Versions,
};

use crate::config::ClusterConfig;
use crate::session::{CqlSession, ScyllaSession};
use crate::splitter::{SemicolonSplitter, StatementSplitter};

/// Table recording applied versions
pub const VERSION_TABLE: &str = "schema_migrations";

/// URL schemes served by this driver
pub const SCHEMES: &[&str] = &["cassandra", "cql"];

/// Migration driver for Cassandra-compatible clusters
pub struct CassandraDriver {
    session: Arc<dyn CqlSession>,
    splitter: Box<dyn StatementSplitter>,
}

impl CassandraDriver {
    /// Connect using a connection URL and prepare the version table.
    ///
    /// ```text
    /// cassandra://localhost/SpaceOfKeys?protocol=4
    /// cassandra://localhost/SpaceOfKeys?protocol=4&consistency=all
    /// cassandra://localhost/SpaceOfKeys?consistency=quorum
    /// ```
    pub async fn open(url: &str) -> DriverResult<Self> {
        let config = ClusterConfig::from_url(url)?;
        tracing::info!(
            "Opening Cassandra migration driver for {}/{}",
            config.contact_point(),
            config.keyspace
        );

        let session = ScyllaSession::connect(&config).await?;
        Self::with_session(Arc::new(session)).await
    }

    /// Wrap an existing session and prepare the version table
    pub async fn with_session(session: Arc<dyn CqlSession>) -> DriverResult<Self> {
        let driver = Self {
            session,
            splitter: Box::new(SemicolonSplitter),
        };
        driver.ensure_version_table().await?;
        Ok(driver)
    }

    /// Replace the statement splitter
    pub fn with_splitter(mut self, splitter: impl StatementSplitter + 'static) -> Self {
        self.splitter = Box::new(splitter);
        self
    }

    /// Create the version table when it does not exist yet
    pub async fn ensure_version_table(&self) -> DriverResult<()> {
        self.session
            .execute(&create_version_table_cql(), &[])
            .await
            .map_err(|e| DriverError::Schema(format!("Failed to create {} table: {}", VERSION_TABLE, e)))
    }

    async fn apply(&self, version: Version, direction: Direction, content: &str) -> DriverResult<()> {
        match direction {
            Direction::Up => self.session.execute(&insert_version_cql(), &[version]).await?,
            Direction::Down => self.session.execute(&delete_version_cql(), &[version]).await?,
        }

        let statements = self.splitter.split(content);
        let total = statements.len();
        for (index, statement) in statements.into_iter().enumerate() {
            tracing::debug!("Migration {}: statement {}/{}: {}", version, index + 1, total, statement);
            self.session.execute(statement, &[]).await?;
        }

        Ok(())
    }

    /// Remove the version row after a failed migration, keeping `err` as the
    /// primary failure.
    async fn compensate(&self, version: Version, err: DriverError) -> DriverError {
        tracing::warn!("Migration {} failed, removing its version record: {}", version, err);

        match self.session.execute(&delete_version_cql(), &[version]).await {
            Ok(()) => err,
            Err(rollback) => {
                tracing::error!("Failed to remove version record {}: {}", version, rollback);
                err.with_rollback_failure(rollback)
            }
        }
    }
}

#[async_trait]
impl Driver for CassandraDriver {
    async fn close(self: Box<Self>) -> DriverResult<()> {
        self.session.close().await
    }

    async fn migrate(&self, file: &mut MigrationFile) -> DriverResult<()> {
        file.read_content()?;

        let version = file.version();
        let direction = file.direction();
        let content = file.content().unwrap_or_default();
        tracing::info!("Applying migration {} ({})", file.file_name(), direction);

        if let Err(err) = self.apply(version, direction, content).await {
            return Err(self.compensate(version, err).await);
        }

        tracing::info!("Migration {} committed", file.file_name());
        Ok(())
    }

    async fn versions(&self) -> DriverResult<Versions> {
        match self.session.query_versions(&select_versions_cql()).await {
            Ok(mut versions) => {
                sort_descending(&mut versions);
                Ok(versions)
            }
            Err(DriverError::VersionScan { mut versions, message }) => {
                sort_descending(&mut versions);
                Err(DriverError::VersionScan { versions, message })
            }
            Err(e) => Err(e),
        }
    }

    async fn execute(&self, statement: &str) -> DriverResult<()> {
        self.session.execute(statement, &[]).await
    }
}

/// Opens [`CassandraDriver`]s for a [`DriverRegistry`]
#[derive(Debug, Default, Clone, Copy)]
pub struct CassandraDriverFactory;

#[async_trait]
impl DriverFactory for CassandraDriverFactory {
    async fn open(&self, url: &str) -> DriverResult<Box<dyn Driver>> {
        Ok(Box::new(CassandraDriver::open(url).await?))
    }
}

/// Register the Cassandra driver under the `cassandra` and `cql` schemes
pub fn register(registry: &mut DriverRegistry) {
    registry.register(SCHEMES, Arc::new(CassandraDriverFactory));
}

fn sort_descending(versions: &mut Versions) {
    versions.sort_unstable_by(|a, b| b.cmp(a));
}

fn create_version_table_cql() -> String {
    format!("CREATE TABLE IF NOT EXISTS {} (version bigint primary key);", VERSION_TABLE)
}

fn insert_version_cql() -> String {
    format!("INSERT INTO {} (version) VALUES (?)", VERSION_TABLE)
}

fn delete_version_cql() -> String {
    format!("DELETE FROM {} WHERE version = ?", VERSION_TABLE)
}

fn select_versions_cql() -> String {
    format!("SELECT version FROM {}", VERSION_TABLE)
}

//! Error types for migration drivers
//!
//! Every driver operation reports failures through [`DriverError`]. The
//! variants mirror the stages a driver can fail in: reading its connection
//! URL, reaching the cluster, preparing the bookkeeping table, executing
//! statements and loading migration files.

use crate::file::Versions;

/// Result type alias for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Error types for migration driver operations
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Malformed URL, unknown scheme or invalid connection parameter
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Session establishment failed (network, authentication, TLS)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The version bookkeeping table could not be prepared
    #[error("Schema error: {0}")]
    Schema(String),

    /// A statement failed against the cluster
    #[error("Execution error: {0}")]
    Execution(String),

    /// A migration file could not be parsed or read
    #[error("Migration file error: {0}")]
    File(String),

    /// A migration failed and the follow-up bookkeeping delete failed too
    #[error("{original}; failed to rollback version: {rollback}")]
    Compensation {
        original: Box<DriverError>,
        rollback: Box<DriverError>,
    },

    /// Scanning applied versions failed part way through
    #[error("Version scan error: {message}")]
    VersionScan {
        /// Versions read before the failure, most recent first
        versions: Versions,
        message: String,
    },
}

impl DriverError {
    /// Wrap `self` with the failure of the compensating bookkeeping delete.
    pub fn with_rollback_failure(self, rollback: DriverError) -> Self {
        DriverError::Compensation {
            original: Box::new(self),
            rollback: Box::new(rollback),
        }
    }

    /// The error that started the failure, skipping compensation wrappers.
    pub fn root_cause(&self) -> &DriverError {
        match self {
            DriverError::Compensation { original, .. } => original.root_cause(),
            other => other,
        }
    }

    /// Versions recovered before a scan failure, if any.
    pub fn partial_versions(&self) -> Option<&[i64]> {
        match self {
            DriverError::VersionScan { versions, .. } => Some(versions.as_slice()),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.root_cause(), DriverError::Configuration(_))
    }
}

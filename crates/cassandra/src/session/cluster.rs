//! Cluster session backed by the `scylla` client.

use std::net::IpAddr;
use std::pin::pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use migrate_driver::{DriverError, DriverResult, Versions};
use openssl::ssl::{SslContext, SslContextBuilder, SslFiletype, SslMethod, SslVerifyMode};
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::policies::host_filter::AllowListHostFilter;
use scylla::statement::Consistency;

use super::CqlSession;
use crate::config::{ClusterConfig, ConsistencyLevel, TlsOptions};

/// The only native protocol version the client speaks
pub const SUPPORTED_PROTOCOL_VERSION: u8 = 4;

impl From<ConsistencyLevel> for Consistency {
    fn from(level: ConsistencyLevel) -> Self {
        match level {
            ConsistencyLevel::Any => Consistency::Any,
            ConsistencyLevel::One => Consistency::One,
            ConsistencyLevel::Two => Consistency::Two,
            ConsistencyLevel::Three => Consistency::Three,
            ConsistencyLevel::Quorum => Consistency::Quorum,
            ConsistencyLevel::All => Consistency::All,
            ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
            ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
            ConsistencyLevel::LocalOne => Consistency::LocalOne,
        }
    }
}

/// Session to a live Cassandra or ScyllaDB cluster
pub struct ScyllaSession {
    session: Session,
}

impl ScyllaSession {
    /// Connect to the cluster described by `config`
    pub async fn connect(config: &ClusterConfig) -> DriverResult<Self> {
        if let Some(version) = config.protocol_version {
            if version != SUPPORTED_PROTOCOL_VERSION {
                return Err(DriverError::Configuration(format!(
                    "Unsupported protocol version {}: only version {} is available",
                    version, SUPPORTED_PROTOCOL_VERSION
                )));
            }
        }

        let contact_point = config.contact_point();

        let profile = ExecutionProfile::builder()
            .consistency(config.consistency.into())
            .request_timeout(Some(config.timeout))
            .build();

        let mut builder = SessionBuilder::new()
            .known_node(&contact_point)
            .connection_timeout(config.timeout)
            .default_execution_profile_handle(profile.into_handle())
            .use_keyspace(&config.keyspace, true);

        if let Some(credentials) = &config.credentials {
            builder = builder.user(&credentials.username, &credentials.password);
        }

        if config.disable_initial_host_lookup {
            let filter = AllowListHostFilter::new([contact_point.as_str()]).map_err(|e| {
                DriverError::Configuration(format!("Failed to resolve seed host {}: {}", contact_point, e))
            })?;
            builder = builder.host_filter(Arc::new(filter));
        }

        if let Some(tls) = &config.tls {
            builder = builder.tls_context(Some(build_tls_context(tls, &config.host)?));
        }

        tracing::debug!(
            "Connecting to {} (keyspace: {}, consistency: {}, tls: {})",
            contact_point,
            config.keyspace,
            config.consistency,
            config.tls.is_some()
        );

        let session = builder.build().await.map_err(|e| {
            DriverError::Connection(format!("Failed to connect to {}: {}", contact_point, e))
        })?;

        Ok(Self { session })
    }

    /// Get the underlying client session
    pub fn inner(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl CqlSession for ScyllaSession {
    async fn execute(&self, cql: &str, values: &[i64]) -> DriverResult<()> {
        self.session
            .query_unpaged(cql, values)
            .await
            .map_err(|e| DriverError::Execution(format!("Failed to execute '{}': {}", cql, e)))?;
        Ok(())
    }

    async fn query_versions(&self, cql: &str) -> DriverResult<Versions> {
        let mut versions = Versions::new();

        let pager = match self.session.query_iter(cql, ()).await {
            Ok(pager) => pager,
            Err(e) => {
                return Err(DriverError::VersionScan {
                    versions,
                    message: e.to_string(),
                })
            }
        };

        let rows = match pager.rows_stream::<(i64,)>() {
            Ok(rows) => rows,
            Err(e) => {
                return Err(DriverError::VersionScan {
                    versions,
                    message: e.to_string(),
                })
            }
        };

        let mut rows = pin!(rows);
        while let Some(row) = rows.next().await {
            match row {
                Ok((version,)) => versions.push(version),
                Err(e) => {
                    return Err(DriverError::VersionScan {
                        versions,
                        message: e.to_string(),
                    })
                }
            }
        }

        Ok(versions)
    }

    async fn close(&self) -> DriverResult<()> {
        // Connections are torn down when the session is dropped.
        tracing::debug!("Closing cluster session");
        Ok(())
    }
}

/// Build the OpenSSL context for `tls`
///
/// With `verify_hostname` the peer chain is checked against `root_cert`, or
/// the system trust store when none is given, and the leaf certificate must
/// name `host`.
pub fn build_tls_context(tls: &TlsOptions, host: &str) -> DriverResult<SslContext> {
    let tls_error = |what: &str, e: openssl::error::ErrorStack| {
        DriverError::Configuration(format!("Failed to {}: {}", what, e))
    };

    let mut builder =
        SslContextBuilder::new(SslMethod::tls()).map_err(|e| tls_error("create TLS context", e))?;

    match &tls.root_cert {
        Some(root_cert) => builder
            .set_ca_file(root_cert)
            .map_err(|e| tls_error(&format!("load CA file {}", root_cert.display()), e))?,
        None => builder
            .set_default_verify_paths()
            .map_err(|e| tls_error("load system trust store", e))?,
    }

    if let Some(cert) = &tls.cert {
        builder
            .set_certificate_file(cert, SslFiletype::PEM)
            .map_err(|e| tls_error(&format!("load certificate {}", cert.display()), e))?;
    }

    if let Some(key) = &tls.key {
        builder
            .set_private_key_file(key, SslFiletype::PEM)
            .map_err(|e| tls_error(&format!("load private key {}", key.display()), e))?;
    }

    if tls.verify_hostname {
        let param = builder.verify_param_mut();
        let result = match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
            Ok(ip) => param.set_ip(ip),
            Err(_) => param.set_host(host),
        };
        result.map_err(|e| tls_error(&format!("set expected host {}", host), e))?;
        builder.set_verify(SslVerifyMode::PEER);
    } else {
        builder.set_verify(SslVerifyMode::NONE);
    }

    Ok(builder.build())
}

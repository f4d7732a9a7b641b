//! In-memory session for development and testing
//!
//! Understands just enough CQL to keep the version table and a set of table
//! names, records every statement it accepts and can be told to fail.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use migrate_driver::{DriverError, DriverResult, Versions};
use parking_lot::Mutex;

use super::CqlSession;
use crate::driver::VERSION_TABLE;

const KNOWN_KEYWORDS: &[&str] = &[
    "ALTER", "APPLY", "BEGIN", "CREATE", "DELETE", "DROP", "GRANT", "INSERT", "LIST", "REVOKE",
    "SELECT", "TRUNCATE", "UPDATE", "USE",
];

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashSet<String>,
    versions: BTreeSet<i64>,
    executed: Vec<String>,
    failures: Vec<String>,
    scan_limit: Option<usize>,
    closed: bool,
}

/// In-memory session
#[derive(Debug, Default)]
pub struct MemorySession {
    state: Mutex<MemoryState>,
}

impl MemorySession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement containing `pattern`
    pub fn fail_on(&self, pattern: impl Into<String>) {
        self.state.lock().failures.push(pattern.into());
    }

    /// Stop failing statements
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failures.clear();
        state.scan_limit = None;
    }

    /// Break version scans after `rows` rows
    pub fn fail_scan_after(&self, rows: usize) {
        self.state.lock().scan_limit = Some(rows);
    }

    /// Statements accepted so far, in execution order
    pub fn executed_statements(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    /// Versions currently stored in the version table, ascending
    pub fn recorded_versions(&self) -> Vec<i64> {
        self.state.lock().versions.iter().copied().collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.state.lock().tables.contains(&name.to_lowercase())
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl CqlSession for MemorySession {
    async fn execute(&self, cql: &str, values: &[i64]) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.check_available(cql)?;
        state.apply(cql, values)?;
        state.executed.push(cql.to_string());
        Ok(())
    }

    async fn query_versions(&self, cql: &str) -> DriverResult<Versions> {
        let state = self.state.lock();
        let scan_error = |versions: Versions, message: String| DriverError::VersionScan { versions, message };

        if let Err(e) = state.check_available(cql) {
            return Err(scan_error(Vec::new(), e.to_string()));
        }
        if !state.tables.contains(VERSION_TABLE) {
            return Err(scan_error(Vec::new(), format!("unconfigured table {}", VERSION_TABLE)));
        }

        let versions: Versions = state.versions.iter().copied().collect();
        match state.scan_limit {
            Some(limit) if limit < versions.len() => Err(scan_error(
                versions[..limit].to_vec(),
                format!("connection lost after {} rows", limit),
            )),
            _ => Ok(versions),
        }
    }

    async fn close(&self) -> DriverResult<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}

impl MemoryState {
    fn check_available(&self, cql: &str) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Connection("session is closed".to_string()));
        }
        if let Some(pattern) = self.failures.iter().find(|p| cql.contains(p.as_str())) {
            return Err(DriverError::Execution(format!(
                "injected failure for '{}' (matched '{}')",
                cql, pattern
            )));
        }
        Ok(())
    }

    fn apply(&mut self, cql: &str, values: &[i64]) -> DriverResult<()> {
        let body = cql
            .lines()
            .filter(|line| {
                let line = line.trim_start();
                !line.starts_with("--") && !line.starts_with("//")
            })
            .collect::<Vec<_>>()
            .join(" ");

        let tokens: Vec<String> = body
            .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_uppercase())
            .collect();
        let words: Vec<&str> = tokens.iter().map(String::as_str).collect();

        let keyword = words.first().copied().unwrap_or_default();
        if !KNOWN_KEYWORDS.contains(&keyword) {
            return Err(DriverError::Execution(format!(
                "line 1:0 no viable alternative at input '{}'",
                body.split_whitespace().next().unwrap_or("<EOF>")
            )));
        }

        match words.as_slice() {
            ["CREATE", "TABLE", "IF", "NOT", "EXISTS", name, ..] => {
                self.tables.insert(name.to_lowercase());
            }
            ["CREATE", "TABLE", name, ..] => {
                let name = name.to_lowercase();
                if !self.tables.insert(name.clone()) {
                    return Err(DriverError::Execution(format!("Table {} already exists", name)));
                }
            }
            ["DROP", "TABLE", "IF", "EXISTS", name, ..] => {
                self.drop_table(name);
            }
            ["DROP", "TABLE", name, ..] => {
                if !self.drop_table(name) {
                    return Err(DriverError::Execution(format!(
                        "Table {} doesn't exist",
                        name.to_lowercase()
                    )));
                }
            }
            ["INSERT", "INTO", name, ..] | ["DELETE", "FROM", name, ..]
                if name.eq_ignore_ascii_case(VERSION_TABLE) =>
            {
                if !self.tables.contains(VERSION_TABLE) {
                    return Err(DriverError::Execution(format!("unconfigured table {}", VERSION_TABLE)));
                }
                let version = values.first().copied().ok_or_else(|| {
                    DriverError::Execution(format!("missing bound version for '{}'", cql))
                })?;
                if keyword == "INSERT" {
                    self.versions.insert(version);
                } else {
                    self.versions.remove(&version);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> bool {
        let name = name.to_lowercase();
        if name == VERSION_TABLE {
            self.versions.clear();
        }
        self.tables.remove(&name)
    }
}

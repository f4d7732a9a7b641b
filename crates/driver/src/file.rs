//! Migration Files - The unit of work handed to a driver
//!
//! A migration file carries a version, a direction and the raw statement text.
//! File names follow the `<version>_<name>.<up|down>.<ext>` convention, for
//! example `1481574547_create_users.up.cql`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{DriverError, DriverResult};

/// Migration version number, recorded as a `bigint` by drivers
pub type Version = i64;

/// Applied versions, most recent first
pub type Versions = Vec<Version>;

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Apply the migration
    Up,
    /// Revert the migration
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(DriverError::File(format!("Unknown migration direction: {}", s))),
        }
    }
}

/// A single migration file
#[derive(Debug, Clone)]
pub struct MigrationFile {
    path: Option<PathBuf>,
    file_name: String,
    version: Version,
    name: String,
    direction: Direction,
    content: Option<String>,
}

impl MigrationFile {
    /// Create a migration whose content is already in memory
    pub fn new(
        version: Version,
        name: impl Into<String>,
        direction: Direction,
        content: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            path: None,
            file_name: format!("{}_{}.{}.cql", version, name, direction),
            version,
            name,
            direction,
            content: Some(content.into()),
        }
    }

    /// Describe a migration file on disk. Content is read later by
    /// [`MigrationFile::read_content`].
    pub fn from_path(path: impl AsRef<Path>) -> DriverResult<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DriverError::File(format!("Invalid migration path: {}", path.display())))?;

        let (version, name, direction) = parse_file_name(file_name)?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            file_name: file_name.to_string(),
            version,
            name,
            direction,
            content: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Loaded content, `None` until [`MigrationFile::read_content`] succeeds
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Load the file content from disk. Does nothing when the content is
    /// already present.
    pub fn read_content(&mut self) -> DriverResult<&str> {
        if self.content.is_none() {
            let path = self.path.as_ref().ok_or_else(|| {
                DriverError::File(format!("Migration {} has no content and no path", self.file_name))
            })?;

            let content = fs::read_to_string(path).map_err(|e| {
                DriverError::File(format!("Failed to read migration file {}: {}", path.display(), e))
            })?;

            tracing::debug!("Loaded migration file {} ({} bytes)", path.display(), content.len());
            self.content = Some(content);
        }

        Ok(self.content.as_deref().unwrap_or_default())
    }
}

/// Split a migration file name into version, name and direction.
///
/// Format: `<version>_<name>.<up|down>.<ext>`
pub fn parse_file_name(file_name: &str) -> DriverResult<(Version, String, Direction)> {
    let invalid = || {
        DriverError::File(format!(
            "Migration filename must follow format <version>_<name>.<up|down>.<ext>: {}",
            file_name
        ))
    };

    let (stem, _extension) = file_name.rsplit_once('.').ok_or_else(invalid)?;
    let (base, direction) = stem.rsplit_once('.').ok_or_else(invalid)?;
    let (version, name) = base.split_once('_').ok_or_else(invalid)?;

    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let version = version
        .parse::<Version>()
        .map_err(|e| DriverError::File(format!("Invalid migration version in {}: {}", file_name, e)))?;
    let direction = direction.parse::<Direction>()?;

    Ok((version, name.to_string(), direction))
}

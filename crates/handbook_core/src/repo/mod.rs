//! Directory store: repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the narrow read/write boundary the directory core depends on.
//! - Isolate SQLite query details from services and the query planner.
//!
//! # Invariants
//! - Repositories only accept connections opened through `db::open_db*`.
//! - Constraint violations surface as `RepoError::IntegrityConflict`, never
//!   as opaque database errors.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod activity_repo;
pub mod building_repo;
pub mod organization_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Directory entity kinds, used to qualify not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Activity,
    Building,
    Organization,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activity => write!(f, "activity"),
            Self::Building => write!(f, "building"),
            Self::Organization => write!(f, "organization"),
        }
    }
}

/// Repository error for directory persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: EntityKind, id: i64 },
    /// Store constraint violation (dangling reference, check, uniqueness).
    IntegrityConflict(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::IntegrityConflict(message) => write!(f, "integrity conflict: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "directory repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "directory repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted directory data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_constraint_violation() {
            return Self::IntegrityConflict(value.to_string());
        }
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}

/// Checks schema version and required tables before a repository is built.
fn ensure_connection_ready(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// `?, ?, ?` for `count` positional parameters.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::{placeholders, RepoError};
    use crate::db::DbError;

    #[test]
    fn placeholders_are_comma_separated() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn non_constraint_errors_stay_db_errors() {
        let err: RepoError = DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 1,
        }
        .into();
        assert!(matches!(err, RepoError::Db(_)));
    }
}

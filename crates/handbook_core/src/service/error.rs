//! Service-level error taxonomy shared by directory use-cases.
//!
//! Every kind is deterministic for its input; callers must not retry.

use crate::model::activity::ActivityId;
use crate::model::validation::ValidationError;
use crate::repo::{EntityKind, RepoError};
use crate::taxonomy::TaxonomyError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors returned by directory services.
#[derive(Debug)]
pub enum DirectoryError {
    /// Requested entity does not exist.
    NotFound { entity: EntityKind, id: i64 },
    /// Activity creation/move references a missing parent.
    ParentNotFound(ActivityId),
    /// Activity would land deeper than the taxonomy cap.
    MaxDepthExceeded { level: u16 },
    /// Malformed input rejected before any write.
    Validation(ValidationError),
    /// Store-level constraint violation, passed through unchanged.
    IntegrityConflict(String),
    /// Any other persistence failure.
    Repo(RepoError),
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent activity not found: {id}"),
            Self::MaxDepthExceeded { level } => write!(
                f,
                "{}",
                TaxonomyError::MaxDepthExceeded { level: *level }
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::IntegrityConflict(message) => write!(f, "integrity conflict: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl DirectoryError {
    /// Stable machine-readable code for presentation layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ParentNotFound(_) => "parent_not_found",
            Self::MaxDepthExceeded { .. } => "max_depth_exceeded",
            Self::Validation(_) => "validation_error",
            Self::IntegrityConflict(_) => "integrity_conflict",
            Self::Repo(_) => "storage_error",
        }
    }
}

impl From<RepoError> for DirectoryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::IntegrityConflict(message) => Self::IntegrityConflict(message),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for DirectoryError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TaxonomyError> for DirectoryError {
    fn from(value: TaxonomyError) -> Self {
        match value {
            TaxonomyError::MaxDepthExceeded { level } => Self::MaxDepthExceeded { level },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DirectoryError;
    use crate::repo::{EntityKind, RepoError};

    #[test]
    fn repo_not_found_maps_to_not_found() {
        let err: DirectoryError = RepoError::NotFound {
            entity: EntityKind::Building,
            id: 5,
        }
        .into();
        assert!(matches!(
            err,
            DirectoryError::NotFound {
                entity: EntityKind::Building,
                id: 5
            }
        ));
        assert_eq!(err.to_string(), "building not found: 5");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn repo_conflict_maps_to_integrity_conflict() {
        let err: DirectoryError = RepoError::IntegrityConflict("fk".to_string()).into();
        assert_eq!(err.code(), "integrity_conflict");
    }
}

//! Input validation errors and text normalization shared by write paths.
//!
//! # Invariants
//! - Validation runs before any repository write.
//! - Stored names/addresses are trimmed; their folded copies are lowercase.

use crate::model::activity::ActivityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed input reaching the directory core.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// Phone entry at the given position is blank after trim.
    BlankPhone(usize),
    /// Latitude is not finite or outside `[-90, 90]`.
    LatitudeOutOfRange(f64),
    /// Longitude is not finite or outside `[-180, 180]`.
    LongitudeOutOfRange(f64),
    /// Search radius is negative or not finite.
    InvalidRadius(f64),
    /// Requested activity ids that do not exist, sorted ascending.
    UnknownActivityIds(Vec<ActivityId>),
    /// Reparenting would place an activity under itself or its descendant.
    ActivityCycle {
        activity_id: ActivityId,
        parent_id: ActivityId,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::BlankPhone(index) => write!(f, "phone #{index} must not be blank"),
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude must be within [-90, 90], got {value}")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude must be within [-180, 180], got {value}")
            }
            Self::InvalidRadius(value) => {
                write!(f, "radius must be a non-negative number of km, got {value}")
            }
            Self::UnknownActivityIds(ids) => {
                let joined = ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "unknown activity ids: {joined}")
            }
            Self::ActivityCycle {
                activity_id,
                parent_id,
            } => write!(
                f,
                "activity {activity_id} cannot be moved under its own descendant {parent_id}"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Trims a required text field and rejects blank values.
pub fn normalize_required_text(
    value: impl Into<String>,
    field: &'static str,
) -> Result<String, ValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Trims every phone entry, keeping order and duplicates.
pub fn normalize_phones(phones: &[String]) -> Result<Vec<String>, ValidationError> {
    phones
        .iter()
        .enumerate()
        .map(|(index, phone)| {
            let trimmed = phone.trim();
            if trimmed.is_empty() {
                Err(ValidationError::BlankPhone(index))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

/// Case-folded copy stored next to names and addresses.
pub fn fold_case(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Folds a substring filter without trimming it. Blank input means no filter.
pub fn search_needle(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    Some(value.to_lowercase())
}

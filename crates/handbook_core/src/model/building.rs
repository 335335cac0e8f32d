//! Building domain model.

use crate::geo::GeoPoint;
use crate::model::validation::{normalize_required_text, ValidationError};
use serde::{Deserialize, Serialize};

/// Store-assigned building identifier.
pub type BuildingId = i64;

/// Located building referenced by organizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Building {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Input for creating a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBuilding {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewBuilding {
    /// Returns a trimmed copy after checking address and coordinates.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let address = normalize_required_text(self.address.as_str(), "address")?;
        GeoPoint::new(self.latitude, self.longitude).validate()?;
        Ok(Self {
            address,
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

/// Partial update for a building. Unset fields keep their stored value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildingPatch {
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl BuildingPatch {
    /// Merges this patch over `current` and validates the result.
    pub fn apply_to(&self, current: &Building) -> Result<Building, ValidationError> {
        let candidate = NewBuilding {
            address: self
                .address
                .clone()
                .unwrap_or_else(|| current.address.clone()),
            latitude: self.latitude.unwrap_or(current.latitude),
            longitude: self.longitude.unwrap_or(current.longitude),
        }
        .validated()?;

        Ok(Building {
            id: current.id,
            address: candidate.address,
            latitude: candidate.latitude,
            longitude: candidate.longitude,
        })
    }
}

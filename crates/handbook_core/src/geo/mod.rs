//! Great-circle distance and radius filtering over located entities.
//!
//! # Invariants
//! - `distance_km` is symmetric and zero for identical points.
//! - `within_radius` uses an inclusive boundary (`distance <= radius`).

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const KM_PER_DEGREE_LATITUDE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
const BOUNDING_BOX_SLACK_DEGREES: f64 = 1e-6;

/// Point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Rejects non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

/// Haversine distance between two points in kilometers.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    // Clamp guards asin against rounding just above 1.0 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Returns ids of candidates whose distance to `center` is at most `radius_km`.
///
/// Candidates whose latitude alone puts them outside the radius are skipped
/// before the trigonometric check. Latitude difference never overstates
/// great-circle distance, so the pre-filter cannot drop a boundary match.
pub fn within_radius<I>(center: GeoPoint, radius_km: f64, candidates: I) -> HashSet<i64>
where
    I: IntoIterator<Item = (i64, GeoPoint)>,
{
    let max_lat_delta = radius_km / KM_PER_DEGREE_LATITUDE + BOUNDING_BOX_SLACK_DEGREES;

    candidates
        .into_iter()
        .filter(|(_, point)| (point.latitude - center.latitude).abs() <= max_lat_delta)
        .filter(|(_, point)| distance_km(center, *point) <= radius_km)
        .map(|(id, _)| id)
        .collect()
}

//! Query planner for organization search.
//!
//! # Responsibility
//! - Validate optional search filters.
//! - Resolve the taxonomy filter into a descendant-id set and the geo filter
//!   into a nearby-building-id set before any organization read.
//!
//! # Invariants
//! - Omitted filters impose no constraint; all supplied filters are ANDed.
//! - Snapshots are only consulted for the filters that need them.
//! - Resolved id sets are sorted so the composed read is deterministic.

use crate::geo::{within_radius, GeoPoint};
use crate::model::activity::{Activity, ActivityId};
use crate::model::building::{Building, BuildingId};
use crate::model::validation::{search_needle, ValidationError};
use crate::taxonomy::expand_descendants;

/// Center point plus inclusive search radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRadius {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl GeoRadius {
    pub fn new(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self {
            center: GeoPoint::new(latitude, longitude),
            radius_km,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.center.validate()?;
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            return Err(ValidationError::InvalidRadius(self.radius_km));
        }
        Ok(())
    }
}

/// Caller-facing organization search filters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrganizationQuery {
    /// Case-insensitive substring of the organization name.
    pub name: Option<String>,
    /// Exact containing building.
    pub building_id: Option<BuildingId>,
    /// Taxonomy branch root; matches organizations tagged anywhere under it.
    pub activity_id: Option<ActivityId>,
    pub near: Option<GeoRadius>,
}

impl OrganizationQuery {
    pub fn needs_activities(&self) -> bool {
        self.activity_id.is_some()
    }

    pub fn needs_buildings(&self) -> bool {
        self.near.is_some()
    }
}

/// Fully resolved predicate set consumed by the organization repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrganizationFilter {
    /// Case-folded name needle.
    pub name_folded: Option<String>,
    pub building_id: Option<BuildingId>,
    /// Any-of match against the organization's activity set.
    pub activity_ids: Option<Vec<ActivityId>>,
    /// Membership of the organization's building; empty matches nothing.
    pub building_ids: Option<Vec<BuildingId>>,
}

impl OrganizationFilter {
    pub fn is_unconstrained(&self) -> bool {
        self.name_folded.is_none()
            && self.building_id.is_none()
            && self.activity_ids.is_none()
            && self.building_ids.is_none()
    }
}

/// Resolves `query` against the given snapshots.
///
/// `activities` is only read when a taxonomy filter is present and
/// `buildings` only when a geo filter is present.
pub fn plan_organization_query(
    query: &OrganizationQuery,
    activities: &[Activity],
    buildings: &[Building],
) -> Result<OrganizationFilter, ValidationError> {
    if let Some(near) = &query.near {
        near.validate()?;
    }

    let name_folded = query.name.as_deref().and_then(search_needle);

    let activity_ids = query
        .activity_id
        .map(|root_id| sorted(expand_descendants(root_id, activities)));

    let building_ids = query.near.map(|near| {
        let candidates = buildings
            .iter()
            .map(|building| (building.id, building.location()));
        sorted(within_radius(near.center, near.radius_km, candidates))
    });

    Ok(OrganizationFilter {
        name_folded,
        building_id: query.building_id,
        activity_ids,
        building_ids,
    })
}

fn sorted(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids
}

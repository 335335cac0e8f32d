//! Organization use-case service and search entry point.
//!
//! # Responsibility
//! - Validate organization writes, including strict activity-id resolution.
//! - Run organization search: snapshot, plan, then one composed read.
//!
//! # Invariants
//! - Unknown activity ids reject the whole write; nothing is dropped silently.
//! - Search reads the taxonomy only for taxonomy filters and the building
//!   list only for geo filters.

use crate::model::activity::ActivityId;
use crate::model::organization::{
    NewOrganization, Organization, OrganizationId, OrganizationPatch,
};
use crate::model::validation::ValidationError;
use crate::query::planner::{plan_organization_query, OrganizationQuery};
use crate::repo::activity_repo::ActivityRepository;
use crate::repo::building_repo::{BuildingListQuery, BuildingRepository};
use crate::repo::organization_repo::OrganizationRepository;
use crate::repo::EntityKind;
use crate::service::error::{DirectoryError, DirectoryResult};
use log::{debug, info};
use std::time::Instant;

/// Organization service facade over the three directory repositories.
pub struct OrganizationService<O, A, B>
where
    O: OrganizationRepository,
    A: ActivityRepository,
    B: BuildingRepository,
{
    organizations: O,
    activities: A,
    buildings: B,
}

impl<O, A, B> OrganizationService<O, A, B>
where
    O: OrganizationRepository,
    A: ActivityRepository,
    B: BuildingRepository,
{
    pub fn new(organizations: O, activities: A, buildings: B) -> Self {
        Self {
            organizations,
            activities,
            buildings,
        }
    }

    /// Returns organizations matching every supplied filter, each once.
    pub fn search(&self, query: &OrganizationQuery) -> DirectoryResult<Vec<Organization>> {
        let started_at = Instant::now();
        let activities = if query.needs_activities() {
            self.activities.list_activities()?
        } else {
            Vec::new()
        };
        let buildings = if query.needs_buildings() {
            self.buildings.list_buildings(&BuildingListQuery::default())?
        } else {
            Vec::new()
        };

        let filter = plan_organization_query(query, &activities, &buildings)?;
        let found = self.organizations.list_organizations(&filter)?;
        debug!(
            "event=organization_search module=service status=ok unconstrained={} activity_ids={} building_ids={} results={} duration_ms={}",
            filter.is_unconstrained(),
            filter.activity_ids.as_ref().map_or(0, Vec::len),
            filter.building_ids.as_ref().map_or(0, Vec::len),
            found.len(),
            started_at.elapsed().as_millis()
        );
        Ok(found)
    }

    pub fn get_organization(&self, id: OrganizationId) -> DirectoryResult<Organization> {
        self.organizations
            .get_organization(id)?
            .ok_or(DirectoryError::NotFound {
                entity: EntityKind::Organization,
                id,
            })
    }

    /// Creates one organization. A missing building surfaces as an
    /// integrity conflict from the store.
    pub fn create_organization(&self, input: &NewOrganization) -> DirectoryResult<Organization> {
        let draft = input.validated()?;
        self.ensure_activities_exist(&draft.activity_ids)?;

        let created = self.organizations.insert_organization(&draft)?;
        info!(
            "event=organization_create module=service status=ok organization_id={} activities={}",
            created.id,
            created.activities.len()
        );
        Ok(created)
    }

    /// Applies a per-field patch; `activity_ids` replaces the whole set.
    pub fn update_organization(
        &self,
        id: OrganizationId,
        patch: &OrganizationPatch,
    ) -> DirectoryResult<Organization> {
        let current = self.get_organization(id)?;
        let draft = patch.apply_to(&current)?;
        if patch.activity_ids.is_some() {
            self.ensure_activities_exist(&draft.activity_ids)?;
        }

        let updated = self.organizations.update_organization(id, &draft)?;
        info!("event=organization_update module=service status=ok organization_id={id}");
        Ok(updated)
    }

    pub fn delete_organization(&self, id: OrganizationId) -> DirectoryResult<()> {
        self.organizations.delete_organization(id)?;
        info!("event=organization_delete module=service status=ok organization_id={id}");
        Ok(())
    }

    fn ensure_activities_exist(&self, requested: &[ActivityId]) -> DirectoryResult<()> {
        let existing = self.organizations.existing_activity_ids(requested)?;
        let missing: Vec<ActivityId> = requested
            .iter()
            .copied()
            .filter(|id| existing.binary_search(id).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::UnknownActivityIds(missing).into());
        }
        Ok(())
    }
}

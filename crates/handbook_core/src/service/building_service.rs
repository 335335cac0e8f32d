//! Building use-case service.
//!
//! # Invariants
//! - Addresses are trimmed and coordinates range-checked before writes.
//! - Deleting a referenced building fails with an integrity conflict.

use crate::model::building::{Building, BuildingId, BuildingPatch, NewBuilding};
use crate::repo::building_repo::{BuildingListQuery, BuildingRepository};
use crate::repo::EntityKind;
use crate::service::error::{DirectoryError, DirectoryResult};
use log::info;

/// Building service facade.
pub struct BuildingService<R: BuildingRepository> {
    repo: R,
}

impl<R: BuildingRepository> BuildingService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists buildings, optionally filtered by address substring.
    pub fn list_buildings(&self, query: &BuildingListQuery) -> DirectoryResult<Vec<Building>> {
        self.repo.list_buildings(query).map_err(Into::into)
    }

    pub fn get_building(&self, id: BuildingId) -> DirectoryResult<Building> {
        self.repo.get_building(id)?.ok_or(DirectoryError::NotFound {
            entity: EntityKind::Building,
            id,
        })
    }

    pub fn create_building(&self, input: &NewBuilding) -> DirectoryResult<Building> {
        let validated = input.validated()?;
        let created = self.repo.insert_building(&validated)?;
        info!(
            "event=building_create module=service status=ok building_id={}",
            created.id
        );
        Ok(created)
    }

    pub fn update_building(
        &self,
        id: BuildingId,
        patch: &BuildingPatch,
    ) -> DirectoryResult<Building> {
        let current = self.get_building(id)?;
        let updated = patch.apply_to(&current)?;
        self.repo.update_building(&updated)?;
        info!("event=building_update module=service status=ok building_id={id}");
        Ok(updated)
    }

    pub fn delete_building(&self, id: BuildingId) -> DirectoryResult<()> {
        self.repo.delete_building(id)?;
        info!("event=building_delete module=service status=ok building_id={id}");
        Ok(())
    }
}

//! Activity taxonomy use-case service.
//!
//! # Responsibility
//! - Enforce parent existence and the depth cap before any write.
//! - Recompute levels of a moved subtree on reparenting.
//! - Serve the forest view and descendant expansion over fresh snapshots.
//!
//! # Invariants
//! - Validation completes before the repository write is issued.
//! - A move never creates a cycle or pushes any node past the cap.

use crate::model::activity::{
    Activity, ActivityId, ActivityPatch, NewActivity, MAX_ACTIVITY_LEVEL,
};
use crate::model::validation::{normalize_required_text, ValidationError};
use crate::repo::activity_repo::{ActivityRepository, ActivityUpdate};
use crate::repo::EntityKind;
use crate::service::error::{DirectoryError, DirectoryResult};
use crate::taxonomy::{
    build_forest, compute_level, expand_descendants, relevel_subtree, subtree_height,
    would_create_cycle, ActivityNode,
};
use log::info;
use std::collections::{HashMap, HashSet};

/// Activity service facade.
pub struct ActivityService<R: ActivityRepository> {
    repo: R,
}

impl<R: ActivityRepository> ActivityService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Flat taxonomy listing in creation order.
    pub fn list_activities(&self) -> DirectoryResult<Vec<Activity>> {
        self.repo.list_activities().map_err(Into::into)
    }

    pub fn get_activity(&self, id: ActivityId) -> DirectoryResult<Activity> {
        self.repo.get_activity(id)?.ok_or(DirectoryError::NotFound {
            entity: EntityKind::Activity,
            id,
        })
    }

    /// Nested forest of the whole taxonomy.
    pub fn activity_tree(&self) -> DirectoryResult<Vec<ActivityNode>> {
        let activities = self.repo.list_activities()?;
        Ok(build_forest(&activities))
    }

    /// Ids covered by a search rooted at `root_id`.
    pub fn descendant_ids(&self, root_id: ActivityId) -> DirectoryResult<HashSet<ActivityId>> {
        let activities = self.repo.list_activities()?;
        Ok(expand_descendants(root_id, &activities))
    }

    /// Creates one activity as a root or under an existing parent.
    pub fn create_activity(&self, input: &NewActivity) -> DirectoryResult<Activity> {
        let name = normalize_required_text(input.name.as_str(), "name")?;
        let parent = match input.parent_id {
            Some(parent_id) => Some(
                self.repo
                    .get_activity(parent_id)?
                    .ok_or(DirectoryError::ParentNotFound(parent_id))?,
            ),
            None => None,
        };
        let level = compute_level(parent.as_ref())?;

        let created = self
            .repo
            .insert_activity(name.as_str(), input.parent_id, level)?;
        info!(
            "event=activity_create module=service status=ok activity_id={} level={}",
            created.id, created.level
        );
        Ok(created)
    }

    /// Renames and/or reparents one activity.
    pub fn update_activity(
        &self,
        id: ActivityId,
        patch: &ActivityPatch,
    ) -> DirectoryResult<Activity> {
        let current = self.get_activity(id)?;
        let name = match &patch.name {
            Some(name) => normalize_required_text(name.as_str(), "name")?,
            None => current.name.clone(),
        };

        let (parent_id, levels) = match patch.parent_id {
            Some(new_parent_id) if new_parent_id != current.parent_id => {
                (new_parent_id, self.plan_move(&current, new_parent_id)?)
            }
            _ => (current.parent_id, Vec::new()),
        };

        let updated = self.repo.update_activity(&ActivityUpdate {
            id,
            name,
            parent_id,
            levels,
        })?;
        info!(
            "event=activity_update module=service status=ok activity_id={} level={}",
            updated.id, updated.level
        );
        Ok(updated)
    }

    /// Deletes one activity and its whole subtree.
    pub fn delete_activity(&self, id: ActivityId) -> DirectoryResult<()> {
        self.repo.delete_activity(id)?;
        info!("event=activity_delete module=service status=ok activity_id={id}");
        Ok(())
    }

    /// Validates a move and returns the level changes it implies.
    fn plan_move(
        &self,
        node: &Activity,
        new_parent_id: Option<ActivityId>,
    ) -> DirectoryResult<Vec<(ActivityId, u8)>> {
        let snapshot = self.repo.list_activities()?;

        let new_level = match new_parent_id {
            None => 0,
            Some(parent_id) => {
                let parent = snapshot
                    .iter()
                    .find(|activity| activity.id == parent_id)
                    .ok_or(DirectoryError::ParentNotFound(parent_id))?;
                if would_create_cycle(node.id, parent_id, &snapshot) {
                    return Err(ValidationError::ActivityCycle {
                        activity_id: node.id,
                        parent_id,
                    }
                    .into());
                }
                compute_level(Some(parent))?
            }
        };

        let deepest = u16::from(new_level) + subtree_height(node.id, &snapshot);
        if deepest > u16::from(MAX_ACTIVITY_LEVEL) {
            return Err(DirectoryError::MaxDepthExceeded { level: deepest });
        }

        let current_levels = snapshot
            .iter()
            .map(|activity| (activity.id, activity.level))
            .collect::<HashMap<_, _>>();
        Ok(relevel_subtree(node.id, new_level, &snapshot)
            .into_iter()
            .filter(|(id, level)| current_levels.get(id) != Some(level))
            .collect())
    }
}

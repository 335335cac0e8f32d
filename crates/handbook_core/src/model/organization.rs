//! Organization domain model.
//!
//! # Invariants
//! - Every organization references exactly one building.
//! - Activity references form a set; read models list them by ascending id.
//! - Phones keep caller order, duplicates included.

use crate::model::activity::{ActivityId, ActivityRef};
use crate::model::building::BuildingId;
use crate::model::validation::{normalize_phones, normalize_required_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Store-assigned organization identifier.
pub type OrganizationId = i64;

/// Organization read model with resolved activity references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub phones: Vec<String>,
    pub building_id: BuildingId,
    pub activities: Vec<ActivityRef>,
}

impl Organization {
    pub fn activity_ids(&self) -> Vec<ActivityId> {
        self.activities.iter().map(|activity| activity.id).collect()
    }
}

/// Input for creating an organization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub phones: Vec<String>,
    pub building_id: BuildingId,
    pub activity_ids: Vec<ActivityId>,
}

/// Normalized organization write shape passed to repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationDraft {
    pub name: String,
    pub phones: Vec<String>,
    pub building_id: BuildingId,
    /// Deduplicated, ascending.
    pub activity_ids: Vec<ActivityId>,
}

impl NewOrganization {
    pub fn validated(&self) -> Result<OrganizationDraft, ValidationError> {
        Ok(OrganizationDraft {
            name: normalize_required_text(self.name.as_str(), "name")?,
            phones: normalize_phones(&self.phones)?,
            building_id: self.building_id,
            activity_ids: dedup_activity_ids(&self.activity_ids),
        })
    }
}

/// Partial update for an organization. Unset fields keep their stored value;
/// `activity_ids` replaces the whole set when present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub phones: Option<Vec<String>>,
    pub building_id: Option<BuildingId>,
    pub activity_ids: Option<Vec<ActivityId>>,
}

impl OrganizationPatch {
    /// Merges this patch over `current` and validates the result.
    pub fn apply_to(&self, current: &Organization) -> Result<OrganizationDraft, ValidationError> {
        NewOrganization {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            phones: self
                .phones
                .clone()
                .unwrap_or_else(|| current.phones.clone()),
            building_id: self.building_id.unwrap_or(current.building_id),
            activity_ids: self
                .activity_ids
                .clone()
                .unwrap_or_else(|| current.activity_ids()),
        }
        .validated()
    }
}

fn dedup_activity_ids(ids: &[ActivityId]) -> Vec<ActivityId> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{NewOrganization, Organization, OrganizationPatch};
    use crate::model::activity::ActivityRef;

    #[test]
    fn validated_collapses_duplicate_activity_ids() {
        let input = NewOrganization {
            name: " Pharmacy A ".to_string(),
            phones: vec!["1".to_string(), "1".to_string()],
            building_id: 3,
            activity_ids: vec![5, 2, 5, 2],
        };
        let draft = input.validated().unwrap();
        assert_eq!(draft.name, "Pharmacy A");
        assert_eq!(draft.phones, vec!["1", "1"]);
        assert_eq!(draft.activity_ids, vec![2, 5]);
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let current = Organization {
            id: 1,
            name: "Old".to_string(),
            phones: vec!["100".to_string()],
            building_id: 7,
            activities: vec![ActivityRef {
                id: 4,
                name: "Health".to_string(),
            }],
        };
        let patch = OrganizationPatch {
            name: Some("New".to_string()),
            ..OrganizationPatch::default()
        };
        let draft = patch.apply_to(&current).unwrap();
        assert_eq!(draft.name, "New");
        assert_eq!(draft.phones, vec!["100"]);
        assert_eq!(draft.building_id, 7);
        assert_eq!(draft.activity_ids, vec![4]);
    }
}

//! Activity taxonomy domain model.
//!
//! # Invariants
//! - `level == parent.level + 1`, or `0` for roots.
//! - `level <= MAX_ACTIVITY_LEVEL` (root, child, grandchild).
//! - Activities reference their parent by id only; children are derived.

use serde::{Deserialize, Serialize};

/// Store-assigned activity identifier.
pub type ActivityId = i64;

/// Deepest allowed taxonomy level. Roots are level 0.
pub const MAX_ACTIVITY_LEVEL: u8 = 2;

/// One taxonomy node as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    /// `None` marks a root.
    pub parent_id: Option<ActivityId>,
    pub level: u8,
}

impl Activity {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Input for creating an activity. Level is computed, never supplied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewActivity {
    pub name: String,
    pub parent_id: Option<ActivityId>,
}

/// Partial update for an activity.
///
/// `parent_id: Some(None)` detaches the node into a root; `None` leaves the
/// parent untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityPatch {
    pub name: Option<String>,
    pub parent_id: Option<Option<ActivityId>>,
}

/// Lightweight activity reference carried by organization read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRef {
    pub id: ActivityId,
    pub name: String,
}

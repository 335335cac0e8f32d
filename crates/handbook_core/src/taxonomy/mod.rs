//! Activity taxonomy: forest view, depth enforcement and descendant expansion.
//!
//! # Responsibility
//! - Turn a flat activity snapshot into a nested forest for presentation.
//! - Compute and validate node levels against `MAX_ACTIVITY_LEVEL`.
//! - Expand a category into the ids it covers for organization search.
//!
//! # Invariants
//! - Every function is a pure computation over the snapshot it receives.
//!   Adjacency is rebuilt per call and never cached.
//! - Traversals track visited ids and terminate on malformed (cyclic) input.

use crate::model::activity::{Activity, ActivityId, MAX_ACTIVITY_LEVEL};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Number of hops below a search root that descendant expansion follows.
pub const EXPANSION_MAX_HOPS: u8 = MAX_ACTIVITY_LEVEL;

/// Depth violation raised while computing levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyError {
    /// The node would land at `level`, deeper than the cap.
    MaxDepthExceeded { level: u16 },
}

impl Display for TaxonomyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxDepthExceeded { level } => write!(
                f,
                "activity level {level} exceeds maximum depth {MAX_ACTIVITY_LEVEL}"
            ),
        }
    }
}

impl Error for TaxonomyError {}

/// Forest node: one activity with its children attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityNode {
    pub id: ActivityId,
    pub name: String,
    pub parent_id: Option<ActivityId>,
    pub level: u8,
    /// Input order of the snapshot, not sorted.
    pub children: Vec<ActivityNode>,
}

impl ActivityNode {
    fn leaf(activity: &Activity) -> Self {
        Self {
            id: activity.id,
            name: activity.name.clone(),
            parent_id: activity.parent_id,
            level: activity.level,
            children: Vec::new(),
        }
    }
}

/// Builds the root-first forest from a flat snapshot.
///
/// Activities above `MAX_ACTIVITY_LEVEL` are ignored. An activity whose parent
/// id is missing from the snapshot is an orphan: it is omitted together with
/// its subtree instead of being promoted to a root.
pub fn build_forest(activities: &[Activity]) -> Vec<ActivityNode> {
    let eligible: Vec<&Activity> = activities
        .iter()
        .filter(|activity| activity.level <= MAX_ACTIVITY_LEVEL)
        .collect();
    let known: HashSet<ActivityId> = eligible.iter().map(|activity| activity.id).collect();

    let mut roots = Vec::new();
    let mut children_of: HashMap<ActivityId, Vec<&Activity>> = HashMap::new();
    for activity in eligible {
        match activity.parent_id {
            None => roots.push(activity),
            Some(parent_id) if known.contains(&parent_id) => {
                children_of.entry(parent_id).or_default().push(activity);
            }
            Some(_) => {}
        }
    }

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .filter_map(|root| attach_children(root, &children_of, &mut visited))
        .collect()
}

fn attach_children(
    activity: &Activity,
    children_of: &HashMap<ActivityId, Vec<&Activity>>,
    visited: &mut HashSet<ActivityId>,
) -> Option<ActivityNode> {
    if !visited.insert(activity.id) {
        return None;
    }

    let mut node = ActivityNode::leaf(activity);
    if let Some(children) = children_of.get(&activity.id) {
        node.children = children
            .iter()
            .filter_map(|child| attach_children(child, children_of, visited))
            .collect();
    }
    Some(node)
}

/// Computes the level for a node created under `parent`.
pub fn compute_level(parent: Option<&Activity>) -> Result<u8, TaxonomyError> {
    match parent {
        None => Ok(0),
        Some(parent) => level_below(parent.level),
    }
}

/// Level of a direct child of a node at `parent_level`.
pub fn level_below(parent_level: u8) -> Result<u8, TaxonomyError> {
    let level = u16::from(parent_level) + 1;
    if level > u16::from(MAX_ACTIVITY_LEVEL) {
        return Err(TaxonomyError::MaxDepthExceeded { level });
    }
    Ok(level as u8)
}

/// Returns `root_id` plus every descendant within `EXPANSION_MAX_HOPS` hops.
///
/// The hop cap is counted from the root, whatever the root's own level.
pub fn expand_descendants(root_id: ActivityId, activities: &[Activity]) -> HashSet<ActivityId> {
    let children_of = children_index(activities);
    let mut reached = HashSet::from([root_id]);
    let mut queue = VecDeque::from([(root_id, 0u8)]);

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= EXPANSION_MAX_HOPS {
            continue;
        }
        for &child in children_of.get(&current).map(Vec::as_slice).unwrap_or(&[]) {
            if reached.insert(child) {
                queue.push_back((child, depth + 1));
            }
        }
    }
    reached
}

/// Height of the subtree under `root_id`, in hops. A leaf has height 0.
pub fn subtree_height(root_id: ActivityId, activities: &[Activity]) -> u16 {
    levels_below(root_id, activities)
        .into_iter()
        .map(|(_, depth)| depth)
        .max()
        .unwrap_or(0)
}

/// Returns `(id, new_level)` for `root_id` and all its descendants when the
/// root is placed at `root_level`.
///
/// Callers validate the depth cap first (see [`subtree_height`]).
pub fn relevel_subtree(
    root_id: ActivityId,
    root_level: u8,
    activities: &[Activity],
) -> Vec<(ActivityId, u8)> {
    levels_below(root_id, activities)
        .into_iter()
        .map(|(id, depth)| (id, (u16::from(root_level) + depth).min(u16::from(u8::MAX)) as u8))
        .collect()
}

/// Returns whether placing `node_id` under `candidate_parent_id` would make
/// the node its own ancestor.
pub fn would_create_cycle(
    node_id: ActivityId,
    candidate_parent_id: ActivityId,
    activities: &[Activity],
) -> bool {
    let parent_of: HashMap<ActivityId, Option<ActivityId>> = activities
        .iter()
        .map(|activity| (activity.id, activity.parent_id))
        .collect();

    let mut visited = HashSet::new();
    let mut cursor = Some(candidate_parent_id);
    while let Some(current) = cursor {
        if current == node_id || !visited.insert(current) {
            return true;
        }
        cursor = parent_of.get(&current).copied().flatten();
    }
    false
}

fn children_index(activities: &[Activity]) -> HashMap<ActivityId, Vec<ActivityId>> {
    let mut children_of: HashMap<ActivityId, Vec<ActivityId>> = HashMap::new();
    for activity in activities {
        if let Some(parent_id) = activity.parent_id {
            children_of.entry(parent_id).or_default().push(activity.id);
        }
    }
    children_of
}

/// Breadth-first walk yielding `(id, hops_from_root)`, root included.
fn levels_below(root_id: ActivityId, activities: &[Activity]) -> Vec<(ActivityId, u16)> {
    let children_of = children_index(activities);
    let mut visited = HashSet::from([root_id]);
    let mut ordered = vec![(root_id, 0u16)];
    let mut cursor = 0;

    while let Some(&(current, depth)) = ordered.get(cursor) {
        cursor += 1;
        for &child in children_of.get(&current).map(Vec::as_slice).unwrap_or(&[]) {
            if visited.insert(child) {
                ordered.push((child, depth + 1));
            }
        }
    }
    ordered
}

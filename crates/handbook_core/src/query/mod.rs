//! Organization search: filter composition and resolution.
//!
//! # See also
//! - `repo::organization_repo` for the composed SQL read.

pub mod planner;

//! Directory use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and pure taxonomy/geo/planner logic into
//!   use-case level APIs.
//! - Map storage failures onto the `DirectoryError` taxonomy.

pub mod activity_service;
pub mod building_service;
pub mod error;
pub mod organization_service;

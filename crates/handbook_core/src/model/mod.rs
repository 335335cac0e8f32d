//! Directory domain model.
//!
//! # Responsibility
//! - Define read models and write inputs for activities, buildings and
//!   organizations.
//! - Keep input normalization next to the types it validates.
//!
//! # Invariants
//! - Entities reference each other by id only (arena style); no owned
//!   back-references.

pub mod activity;
pub mod building;
pub mod organization;
pub mod validation;

//! Core of the handbook business directory.
//!
//! Organizations are tagged with a three-tier activity taxonomy and located
//! in buildings; this crate owns the taxonomy rules, the proximity filter and
//! the organization search planner, plus the SQLite store they run against.

pub mod auth;
pub mod config;
pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod taxonomy;

pub use auth::{ApiKeyGate, AuthError, API_KEY_HEADER};
pub use config::{ConfigError, DirectoryConfig};
pub use geo::{distance_km, within_radius, GeoPoint};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::activity::{
    Activity, ActivityId, ActivityPatch, ActivityRef, NewActivity, MAX_ACTIVITY_LEVEL,
};
pub use model::building::{Building, BuildingId, BuildingPatch, NewBuilding};
pub use model::organization::{NewOrganization, Organization, OrganizationId, OrganizationPatch};
pub use model::validation::ValidationError;
pub use query::planner::{
    plan_organization_query, GeoRadius, OrganizationFilter, OrganizationQuery,
};
pub use repo::activity_repo::{ActivityRepository, SqliteActivityRepository};
pub use repo::building_repo::{BuildingListQuery, BuildingRepository, SqliteBuildingRepository};
pub use repo::organization_repo::{OrganizationRepository, SqliteOrganizationRepository};
pub use repo::{EntityKind, RepoError, RepoResult};
pub use service::activity_service::ActivityService;
pub use service::building_service::BuildingService;
pub use service::error::{DirectoryError, DirectoryResult};
pub use service::organization_service::OrganizationService;
pub use taxonomy::{build_forest, compute_level, expand_descendants, ActivityNode};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

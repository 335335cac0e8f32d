use handbook_core::db::open_db_in_memory;
use handbook_core::{
    BuildingListQuery, BuildingPatch, BuildingService, DirectoryError, EntityKind,
    NewBuilding, NewOrganization, SqliteBuildingRepository, ValidationError,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn new_building(address: &str, latitude: f64, longitude: f64) -> NewBuilding {
    NewBuilding {
        address: address.to_string(),
        latitude,
        longitude,
    }
}

#[test]
fn create_get_and_list_by_address() {
    let conn = setup();
    let service = BuildingService::new(SqliteBuildingRepository::try_new(&conn).unwrap());

    let lenina = service
        .create_building(&new_building("  ул. Ленина, 1 ", 55.7558, 37.6173))
        .unwrap();
    service
        .create_building(&new_building("Nevsky prospekt 28", 59.9343, 30.3351))
        .unwrap();

    let loaded = service.get_building(lenina.id).unwrap();
    assert_eq!(loaded.address, "ул. Ленина, 1");
    assert_eq!(loaded.latitude, 55.7558);

    let matched = service
        .list_buildings(&BuildingListQuery {
            address: Some("ЛЕНИНА".to_string()),
        })
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, lenina.id);

    let all = service.list_buildings(&BuildingListQuery::default()).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn address_filter_keeps_surrounding_whitespace() {
    let conn = setup();
    let service = BuildingService::new(SqliteBuildingRepository::try_new(&conn).unwrap());
    let nevsky = service
        .create_building(&new_building("Nevsky prospekt 28", 59.9343, 30.3351))
        .unwrap();
    service
        .create_building(&new_building("Block28", 59.9, 30.3))
        .unwrap();

    let matched = service
        .list_buildings(&BuildingListQuery {
            address: Some(" 28".to_string()),
        })
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, nevsky.id);
}

#[test]
fn create_rejects_blank_address_and_bad_coordinates() {
    let conn = setup();
    let service = BuildingService::new(SqliteBuildingRepository::try_new(&conn).unwrap());

    let blank = service
        .create_building(&new_building(" ", 10.0, 10.0))
        .unwrap_err();
    assert!(matches!(
        blank,
        DirectoryError::Validation(ValidationError::BlankField("address"))
    ));

    let latitude = service
        .create_building(&new_building("Somewhere", 95.0, 10.0))
        .unwrap_err();
    assert!(matches!(
        latitude,
        DirectoryError::Validation(ValidationError::LatitudeOutOfRange(_))
    ));
}

#[test]
fn patch_updates_only_given_fields() {
    let conn = setup();
    let service = BuildingService::new(SqliteBuildingRepository::try_new(&conn).unwrap());

    let building = service
        .create_building(&new_building("Old street 1", 10.0, 20.0))
        .unwrap();
    let updated = service
        .update_building(
            building.id,
            &BuildingPatch {
                latitude: Some(11.5),
                ..BuildingPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.address, "Old street 1");
    assert_eq!(updated.latitude, 11.5);
    assert_eq!(updated.longitude, 20.0);
    assert_eq!(service.get_building(building.id).unwrap(), updated);

    let missing = service
        .update_building(404, &BuildingPatch::default())
        .unwrap_err();
    assert!(matches!(
        missing,
        DirectoryError::NotFound {
            entity: EntityKind::Building,
            id: 404
        }
    ));
}

#[test]
fn delete_referenced_building_is_an_integrity_conflict() {
    let conn = setup();
    let buildings = BuildingService::new(SqliteBuildingRepository::try_new(&conn).unwrap());
    let building = buildings
        .create_building(&new_building("Shared 1", 10.0, 20.0))
        .unwrap();

    let organizations = handbook_core::OrganizationService::new(
        handbook_core::SqliteOrganizationRepository::try_new(&conn).unwrap(),
        handbook_core::SqliteActivityRepository::try_new(&conn).unwrap(),
        SqliteBuildingRepository::try_new(&conn).unwrap(),
    );
    let organization = organizations
        .create_organization(&NewOrganization {
            name: "Tenant".to_string(),
            phones: Vec::new(),
            building_id: building.id,
            activity_ids: Vec::new(),
        })
        .unwrap();

    let err = buildings.delete_building(building.id).unwrap_err();
    assert!(matches!(err, DirectoryError::IntegrityConflict(_)));

    organizations.delete_organization(organization.id).unwrap();
    buildings.delete_building(building.id).unwrap();
    assert!(matches!(
        buildings.get_building(building.id).unwrap_err(),
        DirectoryError::NotFound { .. }
    ));
}

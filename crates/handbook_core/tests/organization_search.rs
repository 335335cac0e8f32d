use handbook_core::db::open_db_in_memory;
use handbook_core::{
    ActivityService, Building, BuildingService, DirectoryError, GeoRadius, NewActivity,
    NewBuilding, NewOrganization, Organization, OrganizationQuery, OrganizationService,
    SqliteActivityRepository, SqliteBuildingRepository, SqliteOrganizationRepository,
    ValidationError,
};
use rusqlite::Connection;

type Organizations<'conn> = OrganizationService<
    SqliteOrganizationRepository<'conn>,
    SqliteActivityRepository<'conn>,
    SqliteBuildingRepository<'conn>,
>;

fn organizations(conn: &Connection) -> Organizations<'_> {
    OrganizationService::new(
        SqliteOrganizationRepository::try_new(conn).unwrap(),
        SqliteActivityRepository::try_new(conn).unwrap(),
        SqliteBuildingRepository::try_new(conn).unwrap(),
    )
}

fn activity(conn: &Connection, name: &str, parent_id: Option<i64>) -> i64 {
    ActivityService::new(SqliteActivityRepository::try_new(conn).unwrap())
        .create_activity(&NewActivity {
            name: name.to_string(),
            parent_id,
        })
        .unwrap()
        .id
}

fn building(conn: &Connection, address: &str, latitude: f64, longitude: f64) -> Building {
    BuildingService::new(SqliteBuildingRepository::try_new(conn).unwrap())
        .create_building(&NewBuilding {
            address: address.to_string(),
            latitude,
            longitude,
        })
        .unwrap()
}

fn organization(
    service: &Organizations<'_>,
    name: &str,
    building_id: i64,
    activity_ids: Vec<i64>,
) -> Organization {
    service
        .create_organization(&NewOrganization {
            name: name.to_string(),
            phones: vec!["2-222-222".to_string()],
            building_id,
            activity_ids,
        })
        .unwrap()
}

fn ids(found: &[Organization]) -> Vec<i64> {
    found.iter().map(|org| org.id).collect()
}

struct Fixture {
    conn: Connection,
    health: i64,
    dentistry: i64,
    orthodontics: i64,
    retail: i64,
    moscow: Building,
    petersburg: Building,
}

fn fixture() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let health = activity(&conn, "Health", None);
    let dentistry = activity(&conn, "Dentistry", Some(health));
    let orthodontics = activity(&conn, "Orthodontics", Some(dentistry));
    let retail = activity(&conn, "Retail", None);
    let moscow = building(&conn, "Tverskaya 1", 55.7558, 37.6173);
    let petersburg = building(&conn, "Nevsky 28", 59.9343, 30.3351);
    Fixture {
        conn,
        health,
        dentistry,
        orthodontics,
        retail,
        moscow,
        petersburg,
    }
}

#[test]
fn name_and_activity_filters_combine_with_and() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    let pharmacy_a = organization(&service, "Pharmacy A", fx.moscow.id, vec![fx.health]);
    organization(&service, "Pharmacy B", fx.petersburg.id, vec![fx.retail]);

    let found = service
        .search(&OrganizationQuery {
            name: Some("Pharmacy".to_string()),
            activity_id: Some(fx.health),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&found), vec![pharmacy_a.id]);
}

#[test]
fn no_filters_return_every_organization_once() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    let first = organization(
        &service,
        "Clinic",
        fx.moscow.id,
        vec![fx.health, fx.dentistry, fx.orthodontics],
    );
    let second = organization(&service, "Shop", fx.petersburg.id, vec![fx.retail]);
    let third = organization(&service, "Empty", fx.moscow.id, Vec::new());

    let found = service.search(&OrganizationQuery::default()).unwrap();
    assert_eq!(ids(&found), vec![first.id, second.id, third.id]);
}

#[test]
fn activity_filter_matches_descendants_without_duplicates() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    let clinic = organization(
        &service,
        "Clinic",
        fx.moscow.id,
        vec![fx.dentistry, fx.orthodontics],
    );
    let braces = organization(&service, "Braces", fx.petersburg.id, vec![fx.orthodontics]);
    organization(&service, "Shop", fx.moscow.id, vec![fx.retail]);

    let found = service
        .search(&OrganizationQuery {
            activity_id: Some(fx.health),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&found), vec![clinic.id, braces.id]);

    let branch = service
        .search(&OrganizationQuery {
            activity_id: Some(fx.orthodontics),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&branch), vec![clinic.id, braces.id]);
}

#[test]
fn name_filter_is_case_insensitive_substring() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    let romashka = organization(&service, "ООО Ромашка", fx.moscow.id, Vec::new());
    organization(&service, "Lilac LLC", fx.moscow.id, Vec::new());

    let found = service
        .search(&OrganizationQuery {
            name: Some("ромаш".to_string()),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&found), vec![romashka.id]);
}

#[test]
fn name_filter_keeps_surrounding_whitespace() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    organization(&service, "Club", fx.moscow.id, Vec::new());
    let pharmacy = organization(&service, "Pharmacy B", fx.moscow.id, Vec::new());

    let found = service
        .search(&OrganizationQuery {
            name: Some(" B".to_string()),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&found), vec![pharmacy.id]);

    let blank = service
        .search(&OrganizationQuery {
            name: Some("  ".to_string()),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(blank.len(), 2);
}

#[test]
fn building_filter_is_exact() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    organization(&service, "North", fx.petersburg.id, Vec::new());
    let south = organization(&service, "South", fx.moscow.id, Vec::new());

    let found = service
        .search(&OrganizationQuery {
            building_id: Some(fx.moscow.id),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&found), vec![south.id]);
}

#[test]
fn geo_filter_selects_organizations_in_nearby_buildings() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    let near = organization(&service, "Near", fx.moscow.id, Vec::new());
    organization(&service, "Far", fx.petersburg.id, Vec::new());

    let found = service
        .search(&OrganizationQuery {
            near: Some(GeoRadius::new(55.75, 37.62, 10.0)),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&found), vec![near.id]);

    let everything = service
        .search(&OrganizationQuery {
            near: Some(GeoRadius::new(55.75, 37.62, 1000.0)),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert_eq!(everything.len(), 2);

    let nothing = service
        .search(&OrganizationQuery {
            near: Some(GeoRadius::new(0.0, 0.0, 1.0)),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert!(nothing.is_empty());
}

#[test]
fn all_filters_together() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    let target = organization(&service, "Smile Dental", fx.moscow.id, vec![fx.dentistry]);
    organization(&service, "Smile Shop", fx.moscow.id, vec![fx.retail]);
    organization(&service, "Smile North", fx.petersburg.id, vec![fx.dentistry]);

    let found = service
        .search(&OrganizationQuery {
            name: Some("smile".to_string()),
            building_id: Some(fx.moscow.id),
            activity_id: Some(fx.health),
            near: Some(GeoRadius::new(55.7558, 37.6173, 0.0)),
        })
        .unwrap();
    assert_eq!(ids(&found), vec![target.id]);
}

#[test]
fn unknown_activity_root_matches_nothing() {
    let fx = fixture();
    let service = organizations(&fx.conn);
    organization(&service, "Clinic", fx.moscow.id, vec![fx.health]);

    let found = service
        .search(&OrganizationQuery {
            activity_id: Some(9_999),
            ..OrganizationQuery::default()
        })
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn invalid_radius_is_a_validation_error() {
    let fx = fixture();
    let service = organizations(&fx.conn);

    let err = service
        .search(&OrganizationQuery {
            near: Some(GeoRadius::new(55.0, 37.0, f64::NAN)),
            ..OrganizationQuery::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::Validation(ValidationError::InvalidRadius(_))
    ));
}

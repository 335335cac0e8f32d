//! Building repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `address_folded` is rewritten on every address change.
//! - Deleting a building still referenced by an organization is rejected by
//!   the store (`ON DELETE RESTRICT`) and surfaces as an integrity conflict.

use crate::model::building::{Building, BuildingId, NewBuilding};
use crate::model::validation::{fold_case, search_needle};
use crate::repo::{ensure_connection_ready, EntityKind, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const BUILDING_SELECT_SQL: &str = "SELECT id, address, latitude, longitude FROM buildings";

/// Query options for listing buildings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildingListQuery {
    /// Case-insensitive address substring.
    pub address: Option<String>,
}

/// Repository interface for building persistence.
pub trait BuildingRepository {
    fn list_buildings(&self, query: &BuildingListQuery) -> RepoResult<Vec<Building>>;
    fn get_building(&self, id: BuildingId) -> RepoResult<Option<Building>>;
    fn insert_building(&self, building: &NewBuilding) -> RepoResult<Building>;
    fn update_building(&self, building: &Building) -> RepoResult<()>;
    fn delete_building(&self, id: BuildingId) -> RepoResult<()>;
}

/// SQLite-backed building repository.
pub struct SqliteBuildingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBuildingRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["buildings"])?;
        Ok(Self { conn })
    }
}

impl BuildingRepository for SqliteBuildingRepository<'_> {
    fn list_buildings(&self, query: &BuildingListQuery) -> RepoResult<Vec<Building>> {
        let mut sql = format!("{BUILDING_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(needle) = query.address.as_deref().and_then(search_needle) {
            sql.push_str(" AND instr(address_folded, ?) > 0");
            bind_values.push(Value::Text(needle));
        }
        sql.push_str(" ORDER BY id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut buildings = Vec::new();
        while let Some(row) = rows.next()? {
            buildings.push(parse_building_row(row)?);
        }
        Ok(buildings)
    }

    fn get_building(&self, id: BuildingId) -> RepoResult<Option<Building>> {
        let building = self
            .conn
            .query_row(
                &format!("{BUILDING_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_building_row(row)),
            )
            .optional()?;
        building.transpose()
    }

    fn insert_building(&self, building: &NewBuilding) -> RepoResult<Building> {
        self.conn.execute(
            "INSERT INTO buildings (address, address_folded, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                building.address,
                fold_case(&building.address),
                building.latitude,
                building.longitude,
            ],
        )?;
        Ok(Building {
            id: self.conn.last_insert_rowid(),
            address: building.address.clone(),
            latitude: building.latitude,
            longitude: building.longitude,
        })
    }

    fn update_building(&self, building: &Building) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE buildings
             SET address = ?2,
                 address_folded = ?3,
                 latitude = ?4,
                 longitude = ?5
             WHERE id = ?1;",
            params![
                building.id,
                building.address,
                fold_case(&building.address),
                building.latitude,
                building.longitude,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Building,
                id: building.id,
            });
        }
        Ok(())
    }

    fn delete_building(&self, id: BuildingId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM buildings WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Building,
                id,
            });
        }
        Ok(())
    }
}

fn parse_building_row(row: &Row<'_>) -> RepoResult<Building> {
    Ok(Building {
        id: row.get("id")?,
        address: row.get("address")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
    })
}

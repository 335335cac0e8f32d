//! Organization repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Translate a resolved `OrganizationFilter` into one composed read.
//! - Keep phones and activity links consistent with their organization row.
//!
//! # Invariants
//! - Every organization appears at most once per result; the taxonomy
//!   predicate is an `EXISTS` sub-select, never a join.
//! - Result order is `id ASC`; phones keep `position` order; activity
//!   references are ordered by activity id.
//! - Writes touching several tables run in one immediate transaction.

use crate::model::activity::{ActivityId, ActivityRef};
use crate::model::organization::{Organization, OrganizationDraft, OrganizationId};
use crate::model::validation::fold_case;
use crate::query::planner::OrganizationFilter;
use crate::repo::{ensure_connection_ready, placeholders, EntityKind, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;

/// Repository interface for organization persistence and search.
pub trait OrganizationRepository {
    /// Organizations matching every predicate of `filter`.
    fn list_organizations(&self, filter: &OrganizationFilter) -> RepoResult<Vec<Organization>>;
    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>>;
    fn insert_organization(&self, draft: &OrganizationDraft) -> RepoResult<Organization>;
    /// Replaces every field, phones and activity links included.
    fn update_organization(
        &self,
        id: OrganizationId,
        draft: &OrganizationDraft,
    ) -> RepoResult<Organization>;
    /// Removes the organization only; buildings and activities are untouched.
    fn delete_organization(&self, id: OrganizationId) -> RepoResult<()>;
    /// Subset of `ids` that exist in the taxonomy, ascending.
    fn existing_activity_ids(&self, ids: &[ActivityId]) -> RepoResult<Vec<ActivityId>>;
}

/// SQLite-backed organization repository.
pub struct SqliteOrganizationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrganizationRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                "organizations",
                "organization_phones",
                "organization_activities",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl OrganizationRepository for SqliteOrganizationRepository<'_> {
    fn list_organizations(&self, filter: &OrganizationFilter) -> RepoResult<Vec<Organization>> {
        let (where_sql, bind_values) = compose_filter(filter);
        load_organizations(self.conn, &where_sql, &bind_values)
    }

    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>> {
        let mut found = load_organizations(self.conn, "WHERE o.id = ?", &[Value::Integer(id)])?;
        Ok(found.pop())
    }

    fn insert_organization(&self, draft: &OrganizationDraft) -> RepoResult<Organization> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO organizations (name, name_folded, building_id) VALUES (?1, ?2, ?3);",
            params![draft.name, fold_case(&draft.name), draft.building_id],
        )?;
        let id = tx.last_insert_rowid();
        write_links(&tx, id, draft)?;

        let created = load_required(&tx, id)?;
        tx.commit()?;
        Ok(created)
    }

    fn update_organization(
        &self,
        id: OrganizationId,
        draft: &OrganizationDraft,
    ) -> RepoResult<Organization> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE organizations
             SET name = ?2,
                 name_folded = ?3,
                 building_id = ?4
             WHERE id = ?1;",
            params![id, draft.name, fold_case(&draft.name), draft.building_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Organization,
                id,
            });
        }

        tx.execute(
            "DELETE FROM organization_phones WHERE organization_id = ?1;",
            [id],
        )?;
        tx.execute(
            "DELETE FROM organization_activities WHERE organization_id = ?1;",
            [id],
        )?;
        write_links(&tx, id, draft)?;

        let updated = load_required(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_organization(&self, id: OrganizationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM organizations WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Organization,
                id,
            });
        }
        Ok(())
    }

    fn existing_activity_ids(&self, ids: &[ActivityId]) -> RepoResult<Vec<ActivityId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM activities WHERE id IN ({}) ORDER BY id ASC;",
            placeholders(ids.len())
        ))?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        let mut existing = Vec::new();
        while let Some(row) = rows.next()? {
            existing.push(row.get(0)?);
        }
        Ok(existing)
    }
}

/// Builds the `WHERE` clause (aliasing `organizations` as `o`) and its binds.
fn compose_filter(filter: &OrganizationFilter) -> (String, Vec<Value>) {
    let mut sql = String::from("WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(needle) = &filter.name_folded {
        sql.push_str(" AND instr(o.name_folded, ?) > 0");
        bind_values.push(Value::Text(needle.clone()));
    }

    if let Some(building_id) = filter.building_id {
        sql.push_str(" AND o.building_id = ?");
        bind_values.push(Value::Integer(building_id));
    }

    if let Some(activity_ids) = &filter.activity_ids {
        if activity_ids.is_empty() {
            sql.push_str(" AND 0 = 1");
        } else {
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1
                    FROM organization_activities oa
                    WHERE oa.organization_id = o.id
                      AND oa.activity_id IN ({})
                )",
                placeholders(activity_ids.len())
            ));
            bind_values.extend(activity_ids.iter().copied().map(Value::Integer));
        }
    }

    if let Some(building_ids) = &filter.building_ids {
        if building_ids.is_empty() {
            sql.push_str(" AND 0 = 1");
        } else {
            sql.push_str(&format!(
                " AND o.building_id IN ({})",
                placeholders(building_ids.len())
            ));
            bind_values.extend(building_ids.iter().copied().map(Value::Integer));
        }
    }

    (sql, bind_values)
}

/// Loads organizations selected by `where_sql`, then hydrates phones and
/// activity references with the same predicate.
fn load_organizations(
    conn: &Connection,
    where_sql: &str,
    bind_values: &[Value],
) -> RepoResult<Vec<Organization>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT o.id, o.name, o.building_id
         FROM organizations o
         {where_sql}
         ORDER BY o.id ASC;"
    ))?;
    let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
    let mut organizations = Vec::new();
    while let Some(row) = rows.next()? {
        organizations.push(Organization {
            id: row.get(0)?,
            name: row.get(1)?,
            phones: Vec::new(),
            building_id: row.get(2)?,
            activities: Vec::new(),
        });
    }
    if organizations.is_empty() {
        return Ok(organizations);
    }

    let mut phones_by_org: HashMap<OrganizationId, Vec<String>> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT p.organization_id, p.phone
         FROM organization_phones p
         WHERE p.organization_id IN (SELECT o.id FROM organizations o {where_sql})
         ORDER BY p.organization_id ASC, p.position ASC;"
    ))?;
    let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
    while let Some(row) = rows.next()? {
        phones_by_org
            .entry(row.get(0)?)
            .or_default()
            .push(row.get(1)?);
    }

    let mut activities_by_org: HashMap<OrganizationId, Vec<ActivityRef>> = HashMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT oa.organization_id, a.id, a.name
         FROM organization_activities oa
         INNER JOIN activities a ON a.id = oa.activity_id
         WHERE oa.organization_id IN (SELECT o.id FROM organizations o {where_sql})
         ORDER BY oa.organization_id ASC, a.id ASC;"
    ))?;
    let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
    while let Some(row) = rows.next()? {
        activities_by_org
            .entry(row.get(0)?)
            .or_default()
            .push(ActivityRef {
                id: row.get(1)?,
                name: row.get(2)?,
            });
    }

    for organization in &mut organizations {
        organization.phones = phones_by_org.remove(&organization.id).unwrap_or_default();
        organization.activities = activities_by_org
            .remove(&organization.id)
            .unwrap_or_default();
    }
    Ok(organizations)
}

fn load_required(conn: &Connection, id: OrganizationId) -> RepoResult<Organization> {
    load_organizations(conn, "WHERE o.id = ?", &[Value::Integer(id)])?
        .pop()
        .ok_or(RepoError::NotFound {
            entity: EntityKind::Organization,
            id,
        })
}

fn write_links(conn: &Connection, id: OrganizationId, draft: &OrganizationDraft) -> RepoResult<()> {
    for (position, phone) in draft.phones.iter().enumerate() {
        conn.execute(
            "INSERT INTO organization_phones (organization_id, position, phone)
             VALUES (?1, ?2, ?3);",
            params![id, position as i64, phone],
        )?;
    }
    for activity_id in &draft.activity_ids {
        conn.execute(
            "INSERT OR IGNORE INTO organization_activities (organization_id, activity_id)
             VALUES (?1, ?2);",
            params![id, activity_id],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::compose_filter;
    use crate::query::planner::OrganizationFilter;
    use rusqlite::types::Value;

    #[test]
    fn unconstrained_filter_has_no_predicates() {
        let (sql, binds) = compose_filter(&OrganizationFilter::default());
        assert_eq!(sql, "WHERE 1 = 1");
        assert!(binds.is_empty());
    }

    #[test]
    fn empty_id_sets_match_nothing() {
        let filter = OrganizationFilter {
            building_ids: Some(Vec::new()),
            ..OrganizationFilter::default()
        };
        let (sql, binds) = compose_filter(&filter);
        assert!(sql.contains("0 = 1"));
        assert!(binds.is_empty());
    }

    #[test]
    fn binds_follow_predicate_order() {
        let filter = OrganizationFilter {
            name_folded: Some("pharm".to_string()),
            building_id: Some(4),
            activity_ids: Some(vec![1, 2]),
            building_ids: Some(vec![4]),
        };
        let (sql, binds) = compose_filter(&filter);
        assert!(sql.contains("EXISTS"));
        assert_eq!(
            binds,
            vec![
                Value::Text("pharm".to_string()),
                Value::Integer(4),
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(4),
            ]
        );
    }
}

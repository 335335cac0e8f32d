//! Activity repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist taxonomy nodes and their computed levels.
//! - Delete subtrees through the `parent_id ON DELETE CASCADE` constraint.
//!
//! # Invariants
//! - Listing order is `id ASC`, which is creation order.
//! - Level validation happens above this layer; the schema CHECK is a backstop.

use crate::model::activity::{Activity, ActivityId};
use crate::repo::{ensure_connection_ready, EntityKind, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const ACTIVITY_SELECT_SQL: &str = "SELECT id, name, parent_id, level FROM activities";

/// Validated activity rewrite, including level changes of the moved subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityUpdate {
    pub id: ActivityId,
    pub name: String,
    pub parent_id: Option<ActivityId>,
    /// `(id, level)` for every node whose level changes. Empty when the node
    /// keeps its depth.
    pub levels: Vec<(ActivityId, u8)>,
}

/// Repository interface for taxonomy persistence.
pub trait ActivityRepository {
    /// Full taxonomy snapshot.
    fn list_activities(&self) -> RepoResult<Vec<Activity>>;
    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>>;
    fn insert_activity(
        &self,
        name: &str,
        parent_id: Option<ActivityId>,
        level: u8,
    ) -> RepoResult<Activity>;
    /// Applies name/parent and level changes in one transaction.
    fn update_activity(&self, update: &ActivityUpdate) -> RepoResult<Activity>;
    /// Deletes the node and, by cascade, all its descendants.
    fn delete_activity(&self, id: ActivityId) -> RepoResult<()>;
}

/// SQLite-backed activity repository.
pub struct SqliteActivityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["activities"])?;
        Ok(Self { conn })
    }
}

impl ActivityRepository for SqliteActivityRepository<'_> {
    fn list_activities(&self) -> RepoResult<Vec<Activity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACTIVITY_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut activities = Vec::new();
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row)?);
        }
        Ok(activities)
    }

    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        load_activity(self.conn, id)
    }

    fn insert_activity(
        &self,
        name: &str,
        parent_id: Option<ActivityId>,
        level: u8,
    ) -> RepoResult<Activity> {
        self.conn.execute(
            "INSERT INTO activities (name, parent_id, level) VALUES (?1, ?2, ?3);",
            params![name, parent_id, i64::from(level)],
        )?;
        Ok(Activity {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            parent_id,
            level,
        })
    }

    fn update_activity(&self, update: &ActivityUpdate) -> RepoResult<Activity> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE activities
             SET name = ?2,
                 parent_id = ?3
             WHERE id = ?1;",
            params![update.id, update.name, update.parent_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Activity,
                id: update.id,
            });
        }

        for (id, level) in &update.levels {
            tx.execute(
                "UPDATE activities SET level = ?2 WHERE id = ?1;",
                params![id, i64::from(*level)],
            )?;
        }

        let updated = load_activity(&tx, update.id)?.ok_or(RepoError::NotFound {
            entity: EntityKind::Activity,
            id: update.id,
        })?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_activity(&self, id: ActivityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM activities WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Activity,
                id,
            });
        }
        Ok(())
    }
}

fn load_activity(conn: &Connection, id: ActivityId) -> RepoResult<Option<Activity>> {
    let activity = conn
        .query_row(
            &format!("{ACTIVITY_SELECT_SQL} WHERE id = ?1;"),
            [id],
            |row| Ok(parse_activity_row(row)),
        )
        .optional()?;
    activity.transpose()
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    let id: i64 = row.get("id")?;
    let raw_level: i64 = row.get("level")?;
    let level = u8::try_from(raw_level).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid level `{raw_level}` in activities.level for id {id}"
        ))
    })?;

    Ok(Activity {
        id,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
        level,
    })
}

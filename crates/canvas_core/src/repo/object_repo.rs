//! Object registry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist object definitions with their views and permissions.
//! - Delete objects together with everything hanging off them.
//!
//! # Invariants
//! - Registry-created objects are custom and never global.
//! - Deleting an object removes its bindings, records, relationships and
//!   links in the same transaction (`ON DELETE CASCADE`).

use crate::model::ids::{EntityKind, OwnerId};
use crate::model::object::{NewObject, Object, ObjectPatch, ObjectPermissions};
use crate::model::validation::ValidationError;
use crate::policy::{self, AccessAction};
use crate::repo::support::{
    ensure_connection_ready, map_conflict, now_epoch_ms, owner_text, parse_flag, parse_json,
    parse_json_map, parse_owner, to_json_text,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{named_params, Connection, Row, Transaction, TransactionBehavior};

/// Object columns in the order [`parse_object_row`] reads them.
const OBJECT_COLUMNS_SQL: &str = "o.id,
    o.name,
    o.label,
    o.plural_name,
    o.description,
    o.icon,
    o.is_custom,
    o.is_global,
    o.views,
    o.permissions,
    o.created_by,
    o.created_at,
    o.updated_at";

/// Rows removed alongside one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub bindings: u64,
    pub records: u64,
    pub relationships: u64,
    pub links: u64,
}

/// Repository interface for the object registry.
pub trait ObjectRepository {
    /// Creates one custom object owned by `caller`.
    fn create_object(&self, input: &NewObject, caller: OwnerId) -> RepoResult<Object>;
    /// Loads one object if it is visible to `caller`.
    fn get_object(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Object>>;
    /// Lists objects owned by `caller` in insertion order.
    fn list_owned_objects(&self, caller: OwnerId) -> RepoResult<Vec<Object>>;
    /// Applies a partial update to one owned object.
    fn update_object(&self, id: &str, patch: &ObjectPatch, caller: OwnerId) -> RepoResult<Object>;
    /// Deletes one owned object; `None` when absent or invisible.
    fn delete_object(&self, id: &str, caller: OwnerId) -> RepoResult<Option<CascadeSummary>>;
}

/// SQLite-backed object registry.
pub struct SqliteObjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObjectRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                "objects",
                "object_fields",
                "records",
                "relationships",
                "relationship_records",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ObjectRepository for SqliteObjectRepository<'_> {
    fn create_object(&self, input: &NewObject, caller: OwnerId) -> RepoResult<Object> {
        input.validate()?;
        let views = input.resolved_views()?;
        let permissions = input.permissions.clone().unwrap_or_default();

        let id = EntityKind::Object.new_id();
        let now = now_epoch_ms();
        self.conn
            .execute(
                "INSERT INTO objects (
                    id,
                    name,
                    label,
                    plural_name,
                    description,
                    icon,
                    is_custom,
                    is_global,
                    views,
                    permissions,
                    created_by,
                    created_at,
                    updated_at
                ) VALUES (
                    :id, :name, :label, :plural_name, :description, :icon,
                    1, 0, :views, :permissions, :caller, :now, :now
                );",
                named_params! {
                    ":id": id,
                    ":name": input.name,
                    ":label": input.label,
                    ":plural_name": input.plural_name,
                    ":description": input.description,
                    ":icon": input.icon,
                    ":views": to_json_text(&views, "objects.views")?,
                    ":permissions": to_json_text(&permissions, "objects.permissions")?,
                    ":caller": owner_text(caller),
                    ":now": now,
                },
            )
            .map_err(|err| {
                map_conflict(err, EntityKind::Object, || {
                    format!("object `{}` already exists for this owner", input.name)
                })
            })?;

        load_visible_object(self.conn, &id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Object, &id))
    }

    fn get_object(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Object>> {
        load_visible_object(self.conn, id, caller)
    }

    fn list_owned_objects(&self, caller: OwnerId) -> RepoResult<Vec<Object>> {
        let sql = format!(
            "SELECT {OBJECT_COLUMNS_SQL}
             FROM objects o
             WHERE {}
             ORDER BY o.created_at ASC, o.rowid ASC;",
            policy::owned_sql("o")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(named_params! { ":caller": owner_text(caller) })?;

        let mut objects = Vec::new();
        while let Some(row) = rows.next()? {
            objects.push(parse_object_row(row)?);
        }
        Ok(objects)
    }

    fn update_object(&self, id: &str, patch: &ObjectPatch, caller: OwnerId) -> RepoResult<Object> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut object = load_owned_object(&tx, id, caller, AccessAction::Update)?;
        patch.apply_to(&mut object)?;
        object.updated_at = now_epoch_ms();

        tx.execute(
            "UPDATE objects
             SET name = :name,
                 label = :label,
                 plural_name = :plural_name,
                 description = :description,
                 icon = :icon,
                 views = :views,
                 permissions = :permissions,
                 updated_at = :updated_at
             WHERE id = :id;",
            named_params! {
                ":id": object.id,
                ":name": object.name,
                ":label": object.label,
                ":plural_name": object.plural_name,
                ":description": object.description,
                ":icon": object.icon,
                ":views": to_json_text(&object.views, "objects.views")?,
                ":permissions": to_json_text(&object.permissions, "objects.permissions")?,
                ":updated_at": object.updated_at,
            },
        )
        .map_err(|err| {
            map_conflict(err, EntityKind::Object, || {
                format!("object `{}` already exists for this owner", object.name)
            })
        })?;

        tx.commit()?;
        Ok(object)
    }

    fn delete_object(&self, id: &str, caller: OwnerId) -> RepoResult<Option<CascadeSummary>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(object) = load_visible_object(&tx, id, caller)? else {
            return Ok(None);
        };
        policy::check_object_write(&object, caller, AccessAction::Delete)?;

        let summary = count_cascade(&tx, id)?;
        tx.execute("DELETE FROM objects WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(Some(summary))
    }
}

fn count_cascade(conn: &Connection, object_id: &str) -> RepoResult<CascadeSummary> {
    let count = |sql: &str| -> RepoResult<u64> {
        Ok(conn.query_row(sql, [object_id], |row| row.get(0))?)
    };

    Ok(CascadeSummary {
        bindings: count("SELECT COUNT(*) FROM object_fields WHERE object_id = ?1;")?,
        records: count("SELECT COUNT(*) FROM records WHERE object_id = ?1;")?,
        relationships: count(
            "SELECT COUNT(*)
             FROM relationships
             WHERE from_object_id = ?1 OR to_object_id = ?1;",
        )?,
        links: count(
            "SELECT COUNT(*)
             FROM relationship_records rr
             WHERE rr.relationship_id IN (
                     SELECT id FROM relationships
                     WHERE from_object_id = ?1 OR to_object_id = ?1
                 )
                OR rr.from_record_id IN (SELECT id FROM records WHERE object_id = ?1)
                OR rr.to_record_id IN (SELECT id FROM records WHERE object_id = ?1);",
        )?,
    })
}

/// Loads one object through the object read rule.
pub(crate) fn load_visible_object(
    conn: &Connection,
    id: &str,
    caller: OwnerId,
) -> RepoResult<Option<Object>> {
    let sql = format!(
        "SELECT {OBJECT_COLUMNS_SQL}
         FROM objects o
         WHERE o.id = :id
           AND {};",
        policy::object_readable_sql("o")
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(named_params! {
        ":id": id,
        ":caller": owner_text(caller),
    })?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_object_row(row)?));
    }
    Ok(None)
}

/// Loads one object owned by the caller.
///
/// Guards object writes and every record or binding action under the
/// object. Invisible objects yield `NotFound`; visible ones the caller does
/// not own yield `AccessDenied`.
pub(crate) fn load_owned_object(
    conn: &Connection,
    id: &str,
    caller: OwnerId,
    action: AccessAction,
) -> RepoResult<Object> {
    let object = load_visible_object(conn, id, caller)?
        .ok_or_else(|| RepoError::not_found(EntityKind::Object, id))?;
    policy::check_object_write(&object, caller, action)?;
    Ok(object)
}

fn parse_object_row(row: &Row<'_>) -> RepoResult<Object> {
    let views_text: String = row.get(8)?;
    let permissions_text: String = row.get(9)?;
    let permissions: ObjectPermissions = parse_json(&permissions_text, "objects.permissions")?;

    Ok(Object {
        id: row.get(0)?,
        name: row.get(1)?,
        label: row.get(2)?,
        plural_name: row.get(3)?,
        description: row.get(4)?,
        icon: row.get(5)?,
        is_custom: parse_flag(row.get(6)?, "objects.is_custom")?,
        is_global: parse_flag(row.get(7)?, "objects.is_global")?,
        views: parse_json_map(&views_text, "objects.views")?,
        permissions,
        created_by: parse_owner(row.get(10)?, "objects.created_by")?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

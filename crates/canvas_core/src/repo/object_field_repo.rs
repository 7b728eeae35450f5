//! Object-field binding repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Attach library fields to objects with per-object settings.
//! - Resolve bindings together with their field definitions.
//!
//! # Invariants
//! - Bindings follow their parent object: object read rule for reads,
//!   object write rule for writes.
//! - Only fields visible to the caller can be attached.
//! - Listing order is `display_order ASC, created_at ASC, rowid ASC`.

use crate::model::ids::{EntityKind, OwnerId};
use crate::model::object_field::{BindingPatch, NewBinding, ObjectField, ResolvedField};
use crate::model::validation::ValidationError;
use crate::policy::{self, AccessAction};
use crate::repo::field_repo::{load_visible_field, parse_field_columns, FIELD_COLUMNS_SQL};
use crate::repo::object_repo::{load_owned_object, load_visible_object};
use crate::repo::support::{
    ensure_connection_ready, map_conflict, now_epoch_ms, owner_text, parse_flag, parse_json_map,
    to_json_text,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{named_params, Connection, Row, Transaction, TransactionBehavior};

/// Binding columns in the order [`parse_binding_columns`] reads them.
const BINDING_COLUMNS_SQL: &str = "b.id,
    b.object_id,
    b.field_id,
    b.display_order,
    b.is_required,
    b.is_visible,
    b.is_readonly,
    b.field_overrides,
    b.created_at";

const BINDING_COLUMN_COUNT: usize = 9;

const BINDING_ORDER_SQL: &str = "b.display_order ASC, b.created_at ASC, b.rowid ASC";

/// Repository interface for object-field bindings.
pub trait ObjectFieldRepository {
    /// Attaches one visible field to one owned object.
    fn attach_field(&self, input: &NewBinding, caller: OwnerId) -> RepoResult<ObjectField>;
    /// Loads one binding if its object is visible to `caller`.
    fn get_binding(&self, id: &str, caller: OwnerId) -> RepoResult<Option<ObjectField>>;
    /// Lists bindings of one visible object in display order.
    fn list_bindings(&self, object_id: &str, caller: OwnerId) -> RepoResult<Vec<ObjectField>>;
    /// Lists bindings of one visible object joined with their fields.
    fn list_resolved_fields(
        &self,
        object_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<ResolvedField>>;
    /// Applies a partial update to one binding of an owned object.
    fn update_binding(
        &self,
        id: &str,
        patch: &BindingPatch,
        caller: OwnerId,
    ) -> RepoResult<ObjectField>;
    /// Removes one binding; `false` when absent or invisible.
    fn detach_field(&self, id: &str, caller: OwnerId) -> RepoResult<bool>;
}

/// SQLite-backed binding repository.
pub struct SqliteObjectFieldRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObjectFieldRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["objects", "fields", "object_fields"])?;
        Ok(Self { conn })
    }
}

impl ObjectFieldRepository for SqliteObjectFieldRepository<'_> {
    fn attach_field(&self, input: &NewBinding, caller: OwnerId) -> RepoResult<ObjectField> {
        input.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        load_owned_object(&tx, &input.object_id, caller, AccessAction::Insert)?;
        if load_visible_field(&tx, &input.field_id, caller)?.is_none() {
            return Err(RepoError::not_found(EntityKind::Field, &input.field_id));
        }

        let binding = ObjectField {
            id: EntityKind::ObjectField.new_id(),
            object_id: input.object_id.clone(),
            field_id: input.field_id.clone(),
            display_order: input.resolved_display_order(),
            is_required: input.is_required,
            is_visible: input.is_visible,
            is_readonly: input.is_readonly,
            field_overrides: input.field_overrides.clone(),
            created_at: now_epoch_ms(),
        };
        tx.execute(
            "INSERT INTO object_fields (
                id,
                object_id,
                field_id,
                display_order,
                is_required,
                is_visible,
                is_readonly,
                field_overrides,
                created_at
            ) VALUES (
                :id, :object_id, :field_id, :display_order,
                :is_required, :is_visible, :is_readonly, :field_overrides, :created_at
            );",
            named_params! {
                ":id": binding.id,
                ":object_id": binding.object_id,
                ":field_id": binding.field_id,
                ":display_order": binding.display_order,
                ":is_required": binding.is_required,
                ":is_visible": binding.is_visible,
                ":is_readonly": binding.is_readonly,
                ":field_overrides": to_json_text(&binding.field_overrides, "object_fields.field_overrides")?,
                ":created_at": binding.created_at,
            },
        )
        .map_err(|err| {
            map_conflict(err, EntityKind::ObjectField, || {
                format!(
                    "field `{}` is already attached to object `{}`",
                    input.field_id, input.object_id
                )
            })
        })?;

        tx.commit()?;
        Ok(binding)
    }

    fn get_binding(&self, id: &str, caller: OwnerId) -> RepoResult<Option<ObjectField>> {
        load_visible_binding(self.conn, id, caller)
    }

    fn list_bindings(&self, object_id: &str, caller: OwnerId) -> RepoResult<Vec<ObjectField>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        if load_visible_object(&tx, object_id, caller)?.is_none() {
            return Err(RepoError::not_found(EntityKind::Object, object_id));
        }
        let bindings = load_bindings(&tx, object_id)?;
        tx.commit()?;
        Ok(bindings)
    }

    fn list_resolved_fields(
        &self,
        object_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<ResolvedField>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        if load_visible_object(&tx, object_id, caller)?.is_none() {
            return Err(RepoError::not_found(EntityKind::Object, object_id));
        }

        let sql = format!(
            "SELECT {BINDING_COLUMNS_SQL},
                    {FIELD_COLUMNS_SQL}
             FROM object_fields b
             INNER JOIN fields f ON f.id = b.field_id
             WHERE b.object_id = ?1
             ORDER BY {BINDING_ORDER_SQL};"
        );
        let mut resolved = Vec::new();
        {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query([object_id])?;
            while let Some(row) = rows.next()? {
                let binding = parse_binding_columns(row)?;
                let field = parse_field_columns(row, BINDING_COLUMN_COUNT)?;
                resolved.push(ResolvedField::new(binding, field));
            }
        }
        tx.commit()?;
        Ok(resolved)
    }

    fn update_binding(
        &self,
        id: &str,
        patch: &BindingPatch,
        caller: OwnerId,
    ) -> RepoResult<ObjectField> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut binding = load_visible_binding(&tx, id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::ObjectField, id))?;
        load_owned_object(&tx, &binding.object_id, caller, AccessAction::Update)?;
        patch.apply_to(&mut binding)?;

        tx.execute(
            "UPDATE object_fields
             SET display_order = :display_order,
                 is_required = :is_required,
                 is_visible = :is_visible,
                 is_readonly = :is_readonly,
                 field_overrides = :field_overrides
             WHERE id = :id;",
            named_params! {
                ":id": binding.id,
                ":display_order": binding.display_order,
                ":is_required": binding.is_required,
                ":is_visible": binding.is_visible,
                ":is_readonly": binding.is_readonly,
                ":field_overrides": to_json_text(&binding.field_overrides, "object_fields.field_overrides")?,
            },
        )?;

        tx.commit()?;
        Ok(binding)
    }

    fn detach_field(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(binding) = load_visible_binding(&tx, id, caller)? else {
            return Ok(false);
        };
        load_owned_object(&tx, &binding.object_id, caller, AccessAction::Delete)?;

        tx.execute("DELETE FROM object_fields WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(true)
    }
}

/// Lists bindings of `object_id` in display order without a policy check.
///
/// Callers must have authorized access to the object already.
pub(crate) fn load_bindings(conn: &Connection, object_id: &str) -> RepoResult<Vec<ObjectField>> {
    let sql = format!(
        "SELECT {BINDING_COLUMNS_SQL}
         FROM object_fields b
         WHERE b.object_id = ?1
         ORDER BY {BINDING_ORDER_SQL};"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([object_id])?;

    let mut bindings = Vec::new();
    while let Some(row) = rows.next()? {
        bindings.push(parse_binding_columns(row)?);
    }
    Ok(bindings)
}

fn load_visible_binding(
    conn: &Connection,
    id: &str,
    caller: OwnerId,
) -> RepoResult<Option<ObjectField>> {
    let sql = format!(
        "SELECT {BINDING_COLUMNS_SQL}
         FROM object_fields b
         INNER JOIN objects o ON o.id = b.object_id
         WHERE b.id = :id
           AND {};",
        policy::object_readable_sql("o")
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(named_params! {
        ":id": id,
        ":caller": owner_text(caller),
    })?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_binding_columns(row)?));
    }
    Ok(None)
}

fn parse_binding_columns(row: &Row<'_>) -> RepoResult<ObjectField> {
    let overrides_text: String = row.get(7)?;
    Ok(ObjectField {
        id: row.get(0)?,
        object_id: row.get(1)?,
        field_id: row.get(2)?,
        display_order: row.get(3)?,
        is_required: parse_flag(row.get(4)?, "object_fields.is_required")?,
        is_visible: parse_flag(row.get(5)?, "object_fields.is_visible")?,
        is_readonly: parse_flag(row.get(6)?, "object_fields.is_readonly")?,
        field_overrides: parse_json_map(&overrides_text, "object_fields.field_overrides")?,
        created_at: row.get(8)?,
    })
}

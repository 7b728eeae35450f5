//! Field library repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist reusable field definitions.
//! - Filter listings and lookups through the field read rule.
//!
//! # Invariants
//! - `(name, created_by)` uniqueness violations surface as `Conflict`.
//! - A field referenced by any binding cannot be deleted.
//! - Listings are in insertion order: `created_at ASC, rowid ASC`.

use crate::model::field::{Field, FieldListQuery, FieldPatch, FieldScope, FieldType, NewField};
use crate::model::ids::{EntityKind, OwnerId};
use crate::model::validation::ValidationError;
use crate::policy::{self, AccessAction};
use crate::repo::support::{
    ensure_connection_ready, map_conflict, map_restricted, now_epoch_ms, owner_text, parse_flag,
    parse_json_map, parse_owner, to_json_text,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::ToSql;
use rusqlite::{named_params, Connection, Row, Transaction, TransactionBehavior};

/// Field columns in the order [`parse_field_columns`] reads them.
pub(crate) const FIELD_COLUMNS_SQL: &str = "f.id,
    f.name,
    f.label,
    f.type,
    f.description,
    f.config,
    f.category,
    f.is_global,
    f.is_system_field,
    f.is_custom,
    f.created_by,
    f.created_at,
    f.updated_at";

/// Repository interface for the field library.
pub trait FieldRepository {
    /// Creates one custom field owned by `caller`.
    fn create_field(&self, input: &NewField, caller: OwnerId) -> RepoResult<Field>;
    /// Loads one field if it is visible to `caller`.
    fn get_field(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Field>>;
    /// Lists visible fields matching `query`.
    fn list_fields(&self, query: &FieldListQuery, caller: OwnerId) -> RepoResult<Vec<Field>>;
    /// Applies a partial update to one owned custom field.
    fn update_field(&self, id: &str, patch: &FieldPatch, caller: OwnerId) -> RepoResult<Field>;
    /// Deletes one owned custom field; `false` when absent or invisible.
    fn delete_field(&self, id: &str, caller: OwnerId) -> RepoResult<bool>;
}

/// SQLite-backed field library.
pub struct SqliteFieldRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFieldRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["fields", "object_fields"])?;
        Ok(Self { conn })
    }
}

impl FieldRepository for SqliteFieldRepository<'_> {
    fn create_field(&self, input: &NewField, caller: OwnerId) -> RepoResult<Field> {
        input.validate()?;
        policy::check_field_insert(input)?;

        let id = EntityKind::Field.new_id();
        let now = now_epoch_ms();
        self.conn
            .execute(
                "INSERT INTO fields (
                    id,
                    name,
                    label,
                    type,
                    description,
                    config,
                    category,
                    is_global,
                    is_system_field,
                    is_custom,
                    created_by,
                    created_at,
                    updated_at
                ) VALUES (
                    :id, :name, :label, :type, :description, :config, :category,
                    0, 0, 1, :caller, :now, :now
                );",
                named_params! {
                    ":id": id,
                    ":name": input.name,
                    ":label": input.label,
                    ":type": input.field_type.as_str(),
                    ":description": input.description,
                    ":config": to_json_text(&input.config, "fields.config")?,
                    ":category": input.category,
                    ":caller": owner_text(caller),
                    ":now": now,
                },
            )
            .map_err(|err| {
                map_conflict(err, EntityKind::Field, || {
                    format!("field `{}` already exists for this owner", input.name)
                })
            })?;

        load_visible_field(self.conn, &id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Field, &id))
    }

    fn get_field(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Field>> {
        load_visible_field(self.conn, id, caller)
    }

    fn list_fields(&self, query: &FieldListQuery, caller: OwnerId) -> RepoResult<Vec<Field>> {
        let caller_text = owner_text(caller);
        let is_system = query.is_system.map(i64::from);

        let mut clauses = Vec::new();
        let mut params: Vec<(&str, &dyn ToSql)> = Vec::new();
        match query.scope {
            FieldScope::All => {
                clauses.push(policy::field_readable_sql("f"));
                params.push((":caller", &caller_text as &dyn ToSql));
            }
            FieldScope::GlobalOnly => clauses.push("f.is_global = 1".to_string()),
            FieldScope::OwnedCustom => {
                clauses.push(format!("{} AND f.is_custom = 1", policy::owned_sql("f")));
                params.push((":caller", &caller_text as &dyn ToSql));
            }
        }
        if let Some(category) = query.category.as_ref() {
            clauses.push("f.category = :category".to_string());
            params.push((":category", category as &dyn ToSql));
        }
        if let Some(is_system) = is_system.as_ref() {
            clauses.push("f.is_system_field = :is_system".to_string());
            params.push((":is_system", is_system as &dyn ToSql));
        }

        let sql = format!(
            "SELECT {FIELD_COLUMNS_SQL}
             FROM fields f
             WHERE {}
             ORDER BY f.created_at ASC, f.rowid ASC;",
            clauses.join(" AND ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params.as_slice())?;

        let mut fields = Vec::new();
        while let Some(row) = rows.next()? {
            fields.push(parse_field_row(row)?);
        }
        Ok(fields)
    }

    fn update_field(&self, id: &str, patch: &FieldPatch, caller: OwnerId) -> RepoResult<Field> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut field = load_visible_field(&tx, id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Field, id))?;
        policy::check_field_write(&field, caller, AccessAction::Update)?;
        patch.apply_to(&mut field)?;
        field.updated_at = now_epoch_ms();

        tx.execute(
            "UPDATE fields
             SET name = :name,
                 label = :label,
                 type = :type,
                 description = :description,
                 config = :config,
                 category = :category,
                 updated_at = :updated_at
             WHERE id = :id;",
            named_params! {
                ":id": field.id,
                ":name": field.name,
                ":label": field.label,
                ":type": field.field_type.as_str(),
                ":description": field.description,
                ":config": to_json_text(&field.config, "fields.config")?,
                ":category": field.category,
                ":updated_at": field.updated_at,
            },
        )
        .map_err(|err| {
            map_conflict(err, EntityKind::Field, || {
                format!("field `{}` already exists for this owner", field.name)
            })
        })?;

        tx.commit()?;
        Ok(field)
    }

    fn delete_field(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let Some(field) = load_visible_field(&tx, id, caller)? else {
            return Ok(false);
        };
        policy::check_field_write(&field, caller, AccessAction::Delete)?;

        let references: u64 = tx.query_row(
            "SELECT COUNT(*) FROM object_fields WHERE field_id = ?1;",
            [id],
            |row| row.get(0),
        )?;
        if references > 0 {
            return Err(RepoError::RestrictedDelete {
                kind: EntityKind::Field,
                id: id.to_string(),
                blocking: EntityKind::ObjectField,
                references,
            });
        }

        tx.execute("DELETE FROM fields WHERE id = ?1;", [id])
            .map_err(|err| map_restricted(err, EntityKind::Field, id, EntityKind::ObjectField))?;
        tx.commit()?;
        Ok(true)
    }
}

/// Loads one field through the read rule.
pub(crate) fn load_visible_field(
    conn: &Connection,
    id: &str,
    caller: OwnerId,
) -> RepoResult<Option<Field>> {
    let sql = format!(
        "SELECT {FIELD_COLUMNS_SQL}
         FROM fields f
         WHERE f.id = :id
           AND {};",
        policy::field_readable_sql("f")
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(named_params! {
        ":id": id,
        ":caller": owner_text(caller),
    })?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_field_row(row)?));
    }
    Ok(None)
}

/// Parses [`FIELD_COLUMNS_SQL`] starting at column `offset`.
pub(crate) fn parse_field_columns(row: &Row<'_>, offset: usize) -> RepoResult<Field> {
    let type_text: String = row.get(offset + 3)?;
    let field_type = type_text.parse::<FieldType>().map_err(|_| {
        RepoError::InvalidData(format!("invalid field type `{type_text}` in fields.type"))
    })?;
    let config_text: String = row.get(offset + 5)?;

    Ok(Field {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        label: row.get(offset + 2)?,
        field_type,
        description: row.get(offset + 4)?,
        config: parse_json_map(&config_text, "fields.config")?,
        category: row.get(offset + 6)?,
        is_global: parse_flag(row.get(offset + 7)?, "fields.is_global")?,
        is_system_field: parse_flag(row.get(offset + 8)?, "fields.is_system_field")?,
        is_custom: parse_flag(row.get(offset + 9)?, "fields.is_custom")?,
        created_by: parse_owner(row.get(offset + 10)?, "fields.created_by")?,
        created_at: row.get(offset + 11)?,
        updated_at: row.get(offset + 12)?,
    })
}

fn parse_field_row(row: &Row<'_>) -> RepoResult<Field> {
    parse_field_columns(row, 0)
}

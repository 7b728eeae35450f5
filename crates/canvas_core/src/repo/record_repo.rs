//! Record store repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist schema-flexible records in one generic table.
//! - Apply bound-field rules and `primary_value` derivation inside the
//!   write transaction.
//!
//! # Invariants
//! - Every action requires the parent object to be owned by the caller.
//! - Updates are read-merge-write inside one `IMMEDIATE` transaction and
//!   only reject required fields the patch itself clears.
//! - Search folds case with the connection's `casefold` function, so it is
//!   case-insensitive beyond ASCII.
//! - Listings are newest first: `created_at DESC, rowid DESC`.

use crate::db::register_functions;
use crate::model::ids::{EntityKind, OwnerId};
use crate::model::record::{
    check_readonly_fields, check_required_fields, check_required_patch, derive_primary_value,
    merge_record_data, Record, RecordPage, RecordPageQuery, SEARCH_RESULT_LIMIT,
};
use crate::model::validation::validate_entity_id;
use crate::model::JsonMap;
use crate::policy::{self, AccessAction};
use crate::repo::object_field_repo::load_bindings;
use crate::repo::object_repo::load_owned_object;
use crate::repo::support::{
    ensure_connection_ready, escape_like, now_epoch_ms, owner_text, parse_json_map, parse_owner,
    to_json_text,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{named_params, params, Connection, Row, Transaction, TransactionBehavior};

/// Record columns in the order [`parse_record_row`] reads them.
const RECORD_COLUMNS_SQL: &str = "r.id,
    r.object_id,
    r.data,
    r.primary_value,
    r.created_at,
    r.updated_at,
    r.created_by,
    r.updated_by,
    r.tenant_id";

/// Repository interface for the record store.
pub trait RecordRepository {
    /// Creates one record under an owned object.
    fn create_record(&self, object_id: &str, data: &JsonMap, caller: OwnerId)
        -> RepoResult<Record>;
    /// Loads one record if its object is owned by `caller`.
    fn get_record(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Record>>;
    /// Merges `patch` into one record's data.
    fn update_record(&self, id: &str, patch: &JsonMap, caller: OwnerId) -> RepoResult<Record>;
    /// Lists one page of an object's records plus the total count.
    fn list_records(
        &self,
        object_id: &str,
        page: RecordPageQuery,
        caller: OwnerId,
    ) -> RepoResult<RecordPage>;
    /// Case-insensitive substring search over `primary_value`.
    fn search_records(&self, object_id: &str, term: &str, caller: OwnerId)
        -> RepoResult<Vec<Record>>;
    /// Deletes one record and its links; `false` when absent or invisible.
    fn delete_record(&self, id: &str, caller: OwnerId) -> RepoResult<bool>;
}

/// SQLite-backed record store.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["objects", "object_fields", "records", "relationship_records"],
        )?;
        // Connections migrated elsewhere lack the search fold.
        register_functions(conn)?;
        Ok(Self { conn })
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn create_record(
        &self,
        object_id: &str,
        data: &JsonMap,
        caller: OwnerId,
    ) -> RepoResult<Record> {
        validate_entity_id(EntityKind::Object, object_id)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        load_owned_object(&tx, object_id, caller, AccessAction::Insert)?;
        let bindings = load_bindings(&tx, object_id)?;
        check_required_fields(&bindings, data)?;

        let now = now_epoch_ms();
        let record = Record {
            id: EntityKind::Record.new_id(),
            object_id: object_id.to_string(),
            data: data.clone(),
            primary_value: derive_primary_value(data),
            created_at: now,
            updated_at: now,
            created_by: Some(caller),
            updated_by: Some(caller),
            tenant_id: Some(owner_text(caller)),
        };
        tx.execute(
            "INSERT INTO records (
                id,
                object_id,
                data,
                primary_value,
                created_at,
                updated_at,
                created_by,
                updated_by,
                tenant_id
            ) VALUES (
                :id, :object_id, :data, :primary_value, :now, :now, :caller, :caller, :caller
            );",
            named_params! {
                ":id": record.id,
                ":object_id": record.object_id,
                ":data": to_json_text(&record.data, "records.data")?,
                ":primary_value": record.primary_value,
                ":now": now,
                ":caller": owner_text(caller),
            },
        )?;

        tx.commit()?;
        Ok(record)
    }

    fn get_record(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Record>> {
        load_visible_record(self.conn, id, caller)
    }

    fn update_record(&self, id: &str, patch: &JsonMap, caller: OwnerId) -> RepoResult<Record> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut record = load_visible_record(&tx, id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Record, id))?;

        let bindings = load_bindings(&tx, &record.object_id)?;
        check_readonly_fields(&bindings, &record.data, patch)?;
        check_required_patch(&bindings, patch)?;
        merge_record_data(&mut record.data, patch);

        record.primary_value = derive_primary_value(&record.data);
        record.updated_by = Some(caller);
        record.updated_at = now_epoch_ms();

        tx.execute(
            "UPDATE records
             SET data = :data,
                 primary_value = :primary_value,
                 updated_by = :updated_by,
                 updated_at = :updated_at
             WHERE id = :id;",
            named_params! {
                ":id": record.id,
                ":data": to_json_text(&record.data, "records.data")?,
                ":primary_value": record.primary_value,
                ":updated_by": owner_text(caller),
                ":updated_at": record.updated_at,
            },
        )?;

        tx.commit()?;
        Ok(record)
    }

    fn list_records(
        &self,
        object_id: &str,
        page: RecordPageQuery,
        caller: OwnerId,
    ) -> RepoResult<RecordPage> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        load_owned_object(&tx, object_id, caller, AccessAction::Read)?;

        let total: u64 = tx.query_row(
            "SELECT COUNT(*) FROM records WHERE object_id = ?1;",
            [object_id],
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {RECORD_COLUMNS_SQL}
             FROM records r
             WHERE r.object_id = ?1
             ORDER BY r.created_at DESC, r.rowid DESC
             LIMIT ?2 OFFSET ?3;"
        );
        let mut records = Vec::new();
        {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(params![
                object_id,
                i64::from(page.effective_limit()),
                i64::from(page.offset),
            ])?;
            while let Some(row) = rows.next()? {
                records.push(parse_record_row(row)?);
            }
        }

        tx.commit()?;
        Ok(RecordPage { records, total })
    }

    fn search_records(
        &self,
        object_id: &str,
        term: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<Record>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        load_owned_object(&tx, object_id, caller, AccessAction::Read)?;

        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {RECORD_COLUMNS_SQL}
             FROM records r
             WHERE r.object_id = ?1
               AND casefold(r.primary_value) LIKE ?2 ESCAPE '\\'
             ORDER BY r.created_at DESC, r.rowid DESC
             LIMIT ?3;"
        );
        let mut records = Vec::new();
        {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(params![
                object_id,
                format!("%{}%", escape_like(&term.to_lowercase())),
                i64::from(SEARCH_RESULT_LIMIT),
            ])?;
            while let Some(row) = rows.next()? {
                records.push(parse_record_row(row)?);
            }
        }

        tx.commit()?;
        Ok(records)
    }

    fn delete_record(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_visible_record(&tx, id, caller)?.is_none() {
            return Ok(false);
        }
        tx.execute("DELETE FROM records WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(true)
    }
}

/// Loads one record through the record rule.
pub(crate) fn load_visible_record(
    conn: &Connection,
    id: &str,
    caller: OwnerId,
) -> RepoResult<Option<Record>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS_SQL}
         FROM records r
         WHERE r.id = :id
           AND {};",
        policy::record_accessible_sql("r")
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(named_params! {
        ":id": id,
        ":caller": owner_text(caller),
    })?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_record_row(row)?));
    }
    Ok(None)
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<Record> {
    let data_text: String = row.get(2)?;
    Ok(Record {
        id: row.get(0)?,
        object_id: row.get(1)?,
        data: parse_json_map(&data_text, "records.data")?,
        primary_value: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        created_by: parse_owner(row.get(6)?, "records.created_by")?,
        updated_by: parse_owner(row.get(7)?, "records.updated_by")?,
        tenant_id: row.get(8)?,
    })
}

//! Relationship engine repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist typed relationships between objects and the record links
//!   they carry.
//! - Answer symmetric "what is linked to this record" lookups.
//!
//! # Invariants
//! - Relationships and links are visible to their creator only.
//! - Link endpoints must belong to the objects the relationship declares.
//! - Deleting a relationship or either endpoint record removes its links.

use crate::model::ids::{EntityKind, OwnerId};
use crate::model::relationship::{
    NewLink, NewRelationship, Relationship, RelationshipLink, RelationshipPatch,
    RelationshipType,
};
use crate::model::validation::{validate_entity_id, ValidationError};
use crate::policy;
use crate::repo::object_repo::load_visible_object;
use crate::repo::record_repo::load_visible_record;
use crate::repo::support::{
    ensure_connection_ready, map_conflict, now_epoch_ms, owner_text, parse_json_map, parse_owner,
    to_json_text,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{named_params, Connection, Row, Transaction, TransactionBehavior};

/// Relationship columns in the order [`parse_relationship_row`] reads them.
const RELATIONSHIP_COLUMNS_SQL: &str = "rl.id,
    rl.name,
    rl.from_object_id,
    rl.to_object_id,
    rl.type,
    rl.from_label,
    rl.to_label,
    rl.created_by,
    rl.created_at";

/// Link columns in the order [`parse_link_row`] reads them.
const LINK_COLUMNS_SQL: &str = "rr.id,
    rr.relationship_id,
    rr.from_record_id,
    rr.to_record_id,
    rr.relationship_metadata,
    rr.created_by,
    rr.created_at";

/// Repository interface for relationships and record links.
pub trait RelationshipRepository {
    /// Defines one relationship between two visible objects.
    fn create_relationship(
        &self,
        input: &NewRelationship,
        caller: OwnerId,
    ) -> RepoResult<Relationship>;
    /// Loads one relationship created by `caller`.
    fn get_relationship(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Relationship>>;
    /// Lists the caller's relationships where the object is source or target.
    fn list_relationships_for_object(
        &self,
        object_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<Relationship>>;
    /// Renames, retypes or relabels one relationship.
    fn update_relationship(
        &self,
        id: &str,
        patch: &RelationshipPatch,
        caller: OwnerId,
    ) -> RepoResult<Relationship>;
    /// Deletes one relationship and its links; `false` when absent or invisible.
    fn delete_relationship(&self, id: &str, caller: OwnerId) -> RepoResult<bool>;
    /// Links two records through a relationship.
    fn link_records(&self, input: &NewLink, caller: OwnerId) -> RepoResult<RelationshipLink>;
    /// Lists links of `relationship_id` with `record_id` on either endpoint.
    fn related_records(
        &self,
        record_id: &str,
        relationship_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<RelationshipLink>>;
    /// Removes one link; `false` when absent or invisible.
    fn unlink(&self, link_id: &str, caller: OwnerId) -> RepoResult<bool>;
}

/// SQLite-backed relationship engine.
pub struct SqliteRelationshipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationshipRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["objects", "records", "relationships", "relationship_records"],
        )?;
        Ok(Self { conn })
    }
}

impl RelationshipRepository for SqliteRelationshipRepository<'_> {
    fn create_relationship(
        &self,
        input: &NewRelationship,
        caller: OwnerId,
    ) -> RepoResult<Relationship> {
        input.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for object_id in [&input.from_object_id, &input.to_object_id] {
            if load_visible_object(&tx, object_id, caller)?.is_none() {
                return Err(RepoError::not_found(EntityKind::Object, object_id));
            }
        }

        let relationship = Relationship {
            id: EntityKind::Relationship.new_id(),
            name: input.name.clone(),
            from_object_id: input.from_object_id.clone(),
            to_object_id: input.to_object_id.clone(),
            relationship_type: input.relationship_type,
            from_label: input.from_label.clone(),
            to_label: input.to_label.clone(),
            created_by: Some(caller),
            created_at: now_epoch_ms(),
        };
        tx.execute(
            "INSERT INTO relationships (
                id,
                name,
                from_object_id,
                to_object_id,
                type,
                from_label,
                to_label,
                created_by,
                created_at
            ) VALUES (
                :id, :name, :from_object_id, :to_object_id, :type,
                :from_label, :to_label, :caller, :created_at
            );",
            named_params! {
                ":id": relationship.id,
                ":name": relationship.name,
                ":from_object_id": relationship.from_object_id,
                ":to_object_id": relationship.to_object_id,
                ":type": relationship.relationship_type.as_str(),
                ":from_label": relationship.from_label,
                ":to_label": relationship.to_label,
                ":caller": owner_text(caller),
                ":created_at": relationship.created_at,
            },
        )
        .map_err(|err| {
            map_conflict(err, EntityKind::Relationship, || {
                format!(
                    "relationship `{}` already links `{}` to `{}`",
                    input.name, input.from_object_id, input.to_object_id
                )
            })
        })?;

        tx.commit()?;
        Ok(relationship)
    }

    fn get_relationship(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Relationship>> {
        load_owned_relationship(self.conn, id, caller)
    }

    fn list_relationships_for_object(
        &self,
        object_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<Relationship>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        if load_visible_object(&tx, object_id, caller)?.is_none() {
            return Err(RepoError::not_found(EntityKind::Object, object_id));
        }

        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS_SQL}
             FROM relationships rl
             WHERE (rl.from_object_id = :object_id OR rl.to_object_id = :object_id)
               AND {}
             ORDER BY rl.created_at ASC, rl.rowid ASC;",
            policy::owned_sql("rl")
        );
        let mut relationships = Vec::new();
        {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(named_params! {
                ":object_id": object_id,
                ":caller": owner_text(caller),
            })?;
            while let Some(row) = rows.next()? {
                relationships.push(parse_relationship_row(row)?);
            }
        }

        tx.commit()?;
        Ok(relationships)
    }

    fn update_relationship(
        &self,
        id: &str,
        patch: &RelationshipPatch,
        caller: OwnerId,
    ) -> RepoResult<Relationship> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut relationship = load_owned_relationship(&tx, id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Relationship, id))?;
        patch.apply_to(&mut relationship)?;

        tx.execute(
            "UPDATE relationships
             SET name = :name,
                 type = :type,
                 from_label = :from_label,
                 to_label = :to_label
             WHERE id = :id;",
            named_params! {
                ":id": relationship.id,
                ":name": relationship.name,
                ":type": relationship.relationship_type.as_str(),
                ":from_label": relationship.from_label,
                ":to_label": relationship.to_label,
            },
        )
        .map_err(|err| {
            map_conflict(err, EntityKind::Relationship, || {
                format!(
                    "relationship `{}` already links `{}` to `{}`",
                    relationship.name, relationship.from_object_id, relationship.to_object_id
                )
            })
        })?;

        tx.commit()?;
        Ok(relationship)
    }

    fn delete_relationship(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_owned_relationship(&tx, id, caller)?.is_none() {
            return Ok(false);
        }
        tx.execute("DELETE FROM relationships WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(true)
    }

    fn link_records(&self, input: &NewLink, caller: OwnerId) -> RepoResult<RelationshipLink> {
        input.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let relationship = load_owned_relationship(&tx, &input.relationship_id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Relationship, &input.relationship_id))?;
        let from_record = load_visible_record(&tx, &input.from_record_id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Record, &input.from_record_id))?;
        let to_record = load_visible_record(&tx, &input.to_record_id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Record, &input.to_record_id))?;

        ensure_endpoint("from", &relationship.from_object_id, &from_record.object_id)?;
        ensure_endpoint("to", &relationship.to_object_id, &to_record.object_id)?;

        let link = RelationshipLink {
            id: EntityKind::Link.new_id(),
            relationship_id: relationship.id,
            from_record_id: from_record.id,
            to_record_id: to_record.id,
            metadata: input.metadata.clone(),
            created_by: Some(caller),
            created_at: now_epoch_ms(),
        };
        tx.execute(
            "INSERT INTO relationship_records (
                id,
                relationship_id,
                from_record_id,
                to_record_id,
                relationship_metadata,
                created_by,
                created_at
            ) VALUES (
                :id, :relationship_id, :from_record_id, :to_record_id,
                :metadata, :caller, :created_at
            );",
            named_params! {
                ":id": link.id,
                ":relationship_id": link.relationship_id,
                ":from_record_id": link.from_record_id,
                ":to_record_id": link.to_record_id,
                ":metadata": to_json_text(&link.metadata, "relationship_records.relationship_metadata")?,
                ":caller": owner_text(caller),
                ":created_at": link.created_at,
            },
        )
        .map_err(|err| {
            map_conflict(err, EntityKind::Link, || {
                format!(
                    "records `{}` and `{}` are already linked",
                    input.from_record_id, input.to_record_id
                )
            })
        })?;

        tx.commit()?;
        Ok(link)
    }

    fn related_records(
        &self,
        record_id: &str,
        relationship_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<RelationshipLink>> {
        validate_entity_id(EntityKind::Record, record_id)?;
        validate_entity_id(EntityKind::Relationship, relationship_id)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        if load_owned_relationship(&tx, relationship_id, caller)?.is_none() {
            return Err(RepoError::not_found(EntityKind::Relationship, relationship_id));
        }
        if load_visible_record(&tx, record_id, caller)?.is_none() {
            return Err(RepoError::not_found(EntityKind::Record, record_id));
        }

        let sql = format!(
            "SELECT {LINK_COLUMNS_SQL}
             FROM relationship_records rr
             WHERE rr.relationship_id = :relationship_id
               AND (rr.from_record_id = :record_id OR rr.to_record_id = :record_id)
               AND {}
             ORDER BY rr.created_at ASC, rr.rowid ASC;",
            policy::owned_sql("rr")
        );
        let mut links = Vec::new();
        {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(named_params! {
                ":relationship_id": relationship_id,
                ":record_id": record_id,
                ":caller": owner_text(caller),
            })?;
            while let Some(row) = rows.next()? {
                links.push(parse_link_row(row)?);
            }
        }

        tx.commit()?;
        Ok(links)
    }

    fn unlink(&self, link_id: &str, caller: OwnerId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM relationship_records
                 WHERE id IN (
                     SELECT rr.id
                     FROM relationship_records rr
                     WHERE rr.id = :id
                       AND {}
                 );",
                policy::owned_sql("rr")
            ),
            named_params! {
                ":id": link_id,
                ":caller": owner_text(caller),
            },
        )?;
        Ok(changed > 0)
    }
}

fn ensure_endpoint(
    endpoint: &'static str,
    expected_object_id: &str,
    actual_object_id: &str,
) -> Result<(), ValidationError> {
    if expected_object_id == actual_object_id {
        return Ok(());
    }
    Err(ValidationError::LinkEndpointMismatch {
        endpoint,
        expected_object_id: expected_object_id.to_string(),
        actual_object_id: actual_object_id.to_string(),
    })
}

fn load_owned_relationship(
    conn: &Connection,
    id: &str,
    caller: OwnerId,
) -> RepoResult<Option<Relationship>> {
    let sql = format!(
        "SELECT {RELATIONSHIP_COLUMNS_SQL}
         FROM relationships rl
         WHERE rl.id = :id
           AND {};",
        policy::owned_sql("rl")
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(named_params! {
        ":id": id,
        ":caller": owner_text(caller),
    })?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_relationship_row(row)?));
    }
    Ok(None)
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<Relationship> {
    let type_text: String = row.get(4)?;
    let relationship_type = type_text.parse::<RelationshipType>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid relationship type `{type_text}` in relationships.type"
        ))
    })?;

    Ok(Relationship {
        id: row.get(0)?,
        name: row.get(1)?,
        from_object_id: row.get(2)?,
        to_object_id: row.get(3)?,
        relationship_type,
        from_label: row.get(5)?,
        to_label: row.get(6)?,
        created_by: parse_owner(row.get(7)?, "relationships.created_by")?,
        created_at: row.get(8)?,
    })
}

fn parse_link_row(row: &Row<'_>) -> RepoResult<RelationshipLink> {
    let metadata_text: String = row.get(4)?;
    Ok(RelationshipLink {
        id: row.get(0)?,
        relationship_id: row.get(1)?,
        from_record_id: row.get(2)?,
        to_record_id: row.get(3)?,
        metadata: parse_json_map(&metadata_text, "relationship_records.relationship_metadata")?,
        created_by: parse_owner(row.get(5)?, "relationship_records.created_by")?,
        created_at: row.get(6)?,
    })
}

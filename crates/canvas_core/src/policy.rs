//! Access policy for every entity.
//!
//! # Responsibility
//! - Decide which rows a caller may see and which writes it may perform.
//! - Provide the same read rules as SQL predicates so repositories filter
//!   invisible rows inside their queries.
//!
//! # Invariants
//! - Field read: `is_global OR created_by = caller`.
//! - Field writes: `created_by = caller AND is_custom`.
//! - Object read: `is_global OR created_by = caller`; writes: `created_by = caller`.
//! - Records: every action requires the parent object's `created_by = caller`.
//! - Bindings: object read rule for reads, object write rule for writes.
//! - Relationships, links and applications: `created_by = caller`.
//! - A row failing its read rule is reported as absent, never as denied.
//!
//! SQL predicates bind the caller as the named parameter `:caller`.

use crate::model::field::{Field, NewField};
use crate::model::ids::{EntityKind, OwnerId};
use crate::model::object::Object;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    Read,
    Insert,
    Update,
    Delete,
}

impl AccessAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Why a visible row cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Row belongs to another caller or to nobody.
    NotOwner,
    /// Seeded system field; immutable.
    SystemField,
    /// Row is not user-defined.
    NotCustom,
}

/// Write rejected by the access policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    pub kind: EntityKind,
    /// Entity id, or the requested name for inserts.
    pub id: String,
    pub action: AccessAction,
    pub reason: DenialReason,
}

impl Display for PolicyViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason = match self.reason {
            DenialReason::NotOwner => "caller does not own it",
            DenialReason::SystemField => "system fields are immutable",
            DenialReason::NotCustom => "only custom rows can be written",
        };
        write!(
            f,
            "{} denied on {} `{}`: {reason}",
            self.action.as_str(),
            self.kind.label(),
            self.id
        )
    }
}

impl Error for PolicyViolation {}

/// Field read rule.
pub fn can_read_field(field: &Field, caller: OwnerId) -> bool {
    field.is_global || field.created_by == Some(caller)
}

/// Field insert rule: only custom definitions may be created.
pub fn check_field_insert(input: &NewField) -> Result<(), PolicyViolation> {
    if !input.is_custom {
        return Err(PolicyViolation {
            kind: EntityKind::Field,
            id: input.name.clone(),
            action: AccessAction::Insert,
            reason: DenialReason::NotCustom,
        });
    }
    Ok(())
}

/// Field update/delete rule.
pub fn check_field_write(
    field: &Field,
    caller: OwnerId,
    action: AccessAction,
) -> Result<(), PolicyViolation> {
    let reason = if field.is_system_field {
        Some(DenialReason::SystemField)
    } else if field.created_by != Some(caller) {
        Some(DenialReason::NotOwner)
    } else if !field.is_custom {
        Some(DenialReason::NotCustom)
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PolicyViolation {
            kind: EntityKind::Field,
            id: field.id.clone(),
            action,
            reason,
        }),
        None => Ok(()),
    }
}

/// Object read rule.
pub fn can_read_object(object: &Object, caller: OwnerId) -> bool {
    object.is_global || object.created_by == Some(caller)
}

/// Object write rule; also guards bindings and records under the object.
pub fn check_object_write(
    object: &Object,
    caller: OwnerId,
    action: AccessAction,
) -> Result<(), PolicyViolation> {
    check_owner(
        EntityKind::Object,
        &object.id,
        object.created_by,
        caller,
        action,
    )
}

/// Owner-only rule shared by relationships, links and applications.
pub fn check_owner(
    kind: EntityKind,
    id: &str,
    created_by: Option<OwnerId>,
    caller: OwnerId,
    action: AccessAction,
) -> Result<(), PolicyViolation> {
    if created_by == Some(caller) {
        return Ok(());
    }
    Err(PolicyViolation {
        kind,
        id: id.to_string(),
        action,
        reason: DenialReason::NotOwner,
    })
}

/// SQL predicate: field row aliased `alias` is readable by `:caller`.
pub(crate) fn field_readable_sql(alias: &str) -> String {
    format!("({alias}.is_global = 1 OR {alias}.created_by = :caller)")
}

/// SQL predicate: object row aliased `alias` is readable by `:caller`.
pub(crate) fn object_readable_sql(alias: &str) -> String {
    format!("({alias}.is_global = 1 OR {alias}.created_by = :caller)")
}

/// SQL predicate: row aliased `alias` was created by `:caller`.
pub(crate) fn owned_sql(alias: &str) -> String {
    format!("{alias}.created_by = :caller")
}

/// SQL predicate: record row aliased `alias` sits under an object owned by `:caller`.
pub(crate) fn record_accessible_sql(alias: &str) -> String {
    format!(
        "EXISTS (
            SELECT 1
            FROM objects parent
            WHERE parent.id = {alias}.object_id
              AND parent.created_by = :caller
        )"
    )
}

//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define one data access contract per component.
//! - Keep SQLite query details, transactions and policy predicates here.
//!
//! # Invariants
//! - Inputs are validated before any SQL executes.
//! - Multi-statement writes run in one `IMMEDIATE` transaction; multi-read
//!   results come from one snapshot.
//! - Rows invisible to the caller are reported as absent.

use crate::db::DbError;
use crate::model::ids::EntityKind;
use crate::model::validation::ValidationError;
use crate::policy::PolicyViolation;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod application_repo;
pub mod field_repo;
pub mod object_field_repo;
pub mod object_repo;
pub mod record_repo;
pub mod relationship_repo;
pub mod stats_repo;
mod support;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error taxonomy exposed to callers of the object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    RestrictedDelete,
    ValidationFailure,
    StorageFailure,
    AccessDenied,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RestrictedDelete => "restricted_delete",
            Self::ValidationFailure => "validation_failure",
            Self::StorageFailure => "storage_failure",
            Self::AccessDenied => "access_denied",
        }
    }
}

/// Errors from repository and service operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input rejected before persistence.
    Validation(ValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target does not exist or is invisible to the caller.
    NotFound { kind: EntityKind, id: String },
    /// Uniqueness constraint violated.
    Conflict { kind: EntityKind, detail: String },
    /// Delete blocked by rows that still reference the target.
    RestrictedDelete {
        kind: EntityKind,
        id: String,
        blocking: EntityKind,
        references: u64,
    },
    /// Visible target, but the policy forbids the write.
    AccessDenied(PolicyViolation),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Connection does not enforce foreign keys, so cascades would not run.
    ForeignKeysDisabled,
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationFailure,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::RestrictedDelete { .. } => ErrorKind::RestrictedDelete,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::Db(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::ForeignKeysDisabled => ErrorKind::StorageFailure,
        }
    }

    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.label()),
            Self::Conflict { kind, detail } => write!(f, "{} conflict: {detail}", kind.label()),
            Self::RestrictedDelete {
                kind,
                id,
                blocking,
                references,
            } => write!(
                f,
                "{} {id} is still referenced by {references} {} row(s)",
                kind.label(),
                blocking.label()
            ),
            Self::AccessDenied(violation) => write!(f, "{violation}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "object model requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "object model requires table `{table}`")
            }
            Self::ForeignKeysDisabled => {
                write!(f, "object model requires PRAGMA foreign_keys=ON")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::AccessDenied(violation) => Some(violation),
            Self::NotFound { .. }
            | Self::Conflict { .. }
            | Self::RestrictedDelete { .. }
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::ForeignKeysDisabled => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PolicyViolation> for RepoError {
    fn from(value: PolicyViolation) -> Self {
        Self::AccessDenied(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

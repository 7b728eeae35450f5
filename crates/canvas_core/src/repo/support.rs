//! Conversions and connection checks shared by the SQLite repositories.

use crate::db::migrations::latest_version;
use crate::model::ids::{EntityKind, OwnerId};
use crate::model::JsonMap;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{ffi, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Current wall clock in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_owner(value: Option<String>, column: &'static str) -> RepoResult<Option<OwnerId>> {
    value
        .map(|text| {
            Uuid::parse_str(&text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid `{text}` in {column}"))
            })
        })
        .transpose()
}

pub(crate) fn parse_json_map(text: &str, column: &'static str) -> RepoResult<JsonMap> {
    parse_json(text, column)
}

pub(crate) fn parse_json<T: DeserializeOwned>(text: &str, column: &'static str) -> RepoResult<T> {
    serde_json::from_str(text)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

pub(crate) fn to_json_text<T: Serialize>(value: &T, column: &'static str) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode {column}: {err}")))
}

pub(crate) fn owner_text(caller: OwnerId) -> String {
    caller.to_string()
}

/// Maps UNIQUE/PRIMARY KEY violations to `Conflict`; other errors pass through.
pub(crate) fn map_conflict(
    err: rusqlite::Error,
    kind: EntityKind,
    detail: impl FnOnce() -> String,
) -> RepoError {
    if is_constraint(&err, &[ffi::SQLITE_CONSTRAINT_UNIQUE, ffi::SQLITE_CONSTRAINT_PRIMARYKEY]) {
        return RepoError::Conflict {
            kind,
            detail: detail(),
        };
    }
    RepoError::from(err)
}

/// Maps FOREIGN KEY violations raised by a delete to `RestrictedDelete`.
pub(crate) fn map_restricted(
    err: rusqlite::Error,
    kind: EntityKind,
    id: &str,
    blocking: EntityKind,
) -> RepoError {
    if is_constraint(&err, &[ffi::SQLITE_CONSTRAINT_FOREIGNKEY]) {
        return RepoError::RestrictedDelete {
            kind,
            id: id.to_string(),
            blocking,
            references: 0,
        };
    }
    RepoError::from(err)
}

fn is_constraint(err: &rusqlite::Error, extended_codes: &[i32]) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if extended_codes.contains(&failure.extended_code)
    )
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Rejects connections that are unmigrated, lack `tables` or skip foreign keys.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    let foreign_keys: i64 = conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0))?;
    if foreign_keys != 1 {
        return Err(RepoError::ForeignKeysDisabled);
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

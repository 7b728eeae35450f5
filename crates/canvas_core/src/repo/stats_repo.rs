//! Dashboard statistics read from one snapshot.

use crate::model::ids::OwnerId;
use crate::policy;
use crate::repo::support::{ensure_connection_ready, owner_text};
use crate::repo::RepoResult;
use rusqlite::{named_params, Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

/// Per-caller counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Records under objects the caller owns.
    pub total_records: u64,
    /// Objects the caller owns.
    pub active_objects: u64,
    /// Fields visible to the caller, system fields included.
    pub fields_count: u64,
    pub applications_count: u64,
}

pub trait StatsRepository {
    fn dashboard_stats(&self, caller: OwnerId) -> RepoResult<DashboardStats>;
}

/// SQLite-backed statistics reader.
pub struct SqliteStatsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStatsRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["fields", "objects", "records", "applications"])?;
        Ok(Self { conn })
    }
}

impl StatsRepository for SqliteStatsRepository<'_> {
    fn dashboard_stats(&self, caller: OwnerId) -> RepoResult<DashboardStats> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let caller_text = owner_text(caller);
        let count = |sql: String| -> RepoResult<u64> {
            Ok(tx.query_row(&sql, named_params! { ":caller": caller_text }, |row| {
                row.get(0)
            })?)
        };

        let stats = DashboardStats {
            total_records: count(format!(
                "SELECT COUNT(*)
                 FROM records r
                 WHERE {};",
                policy::record_accessible_sql("r")
            ))?,
            active_objects: count(format!(
                "SELECT COUNT(*)
                 FROM objects o
                 WHERE {};",
                policy::owned_sql("o")
            ))?,
            fields_count: count(format!(
                "SELECT COUNT(*)
                 FROM fields f
                 WHERE {};",
                policy::field_readable_sql("f")
            ))?,
            applications_count: count(format!(
                "SELECT COUNT(*)
                 FROM applications a
                 WHERE {};",
                policy::owned_sql("a")
            ))?,
        };

        tx.commit()?;
        Ok(stats)
    }
}

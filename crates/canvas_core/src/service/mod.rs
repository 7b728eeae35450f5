//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Emit one metadata-only log line per operation.
//!
//! # Invariants
//! - Services never bypass repository validation or policy checks.
//! - Log lines carry ids, counts and timings; never record payloads.

use crate::model::ids::OwnerId;
use crate::repo::{ErrorKind, RepoResult};
use log::{log, Level};
use std::time::Instant;

pub mod application_service;
pub mod dashboard_service;
pub mod field_service;
pub mod object_field_service;
pub mod object_model;
pub mod object_service;
pub mod record_service;
pub mod relationship_service;

/// Runs `op` and logs its outcome as `event=<event> module=<module> status=...`.
///
/// Successes log at `level`; storage failures at `error`, other failures at `warn`.
pub(crate) fn observe<T>(
    level: Level,
    module: &'static str,
    event: &'static str,
    target: &str,
    caller: OwnerId,
    op: impl FnOnce() -> RepoResult<T>,
) -> RepoResult<T> {
    let started_at = Instant::now();
    let result = op();
    let duration_ms = started_at.elapsed().as_millis();

    match &result {
        Ok(_) => log!(
            level,
            "event={event} module={module} status=ok duration_ms={duration_ms} target={target} caller={caller}"
        ),
        Err(err) => {
            let kind = err.kind();
            let level = if kind == ErrorKind::StorageFailure {
                Level::Error
            } else {
                Level::Warn
            };
            log!(
                level,
                "event={event} module={module} status=error duration_ms={duration_ms} target={target} caller={caller} error_kind={} error={err}",
                kind.as_str()
            );
        }
    }
    result
}

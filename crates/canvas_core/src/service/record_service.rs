//! Record store use-case service.
//!
//! # Responsibility
//! - Provide record create/merge/list/search entry points.
//!
//! # Invariants
//! - `primary_value` is derived from `data`, never accepted from callers.
//! - Updates merge; keys absent from a patch are kept.
//! - Record payloads never reach the log.

use crate::model::ids::OwnerId;
use crate::model::record::{Record, RecordPage, RecordPageQuery};
use crate::model::JsonMap;
use crate::repo::record_repo::RecordRepository;
use crate::repo::RepoResult;
use crate::service::observe;
use log::Level;

const MODULE: &str = "record_store";

/// Use-case service wrapper for the record store.
pub struct RecordService<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> RecordService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one record under an owned object.
    ///
    /// # Contract
    /// - Every required bound field must carry a non-null, non-blank value.
    /// - Keys without a binding are accepted.
    pub fn create_record(
        &self,
        object_id: &str,
        data: &JsonMap,
        caller: OwnerId,
    ) -> RepoResult<Record> {
        observe(Level::Info, MODULE, "record_create", object_id, caller, || {
            self.repo.create_record(object_id, data, caller)
        })
    }

    pub fn get_record(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Record>> {
        observe(Level::Debug, MODULE, "record_get", id, caller, || {
            self.repo.get_record(id, caller)
        })
    }

    /// Shallow-merges `patch` into the record and recomputes `primary_value`.
    ///
    /// An empty patch is a no-op merge that still stamps `updated_by`.
    pub fn update_record(&self, id: &str, patch: &JsonMap, caller: OwnerId) -> RepoResult<Record> {
        observe(Level::Info, MODULE, "record_update", id, caller, || {
            self.repo.update_record(id, patch, caller)
        })
    }

    /// Returns one page, newest first, with the unpaginated total.
    pub fn get_records_by_object(
        &self,
        object_id: &str,
        offset: u32,
        limit: u32,
        caller: OwnerId,
    ) -> RepoResult<RecordPage> {
        observe(Level::Debug, MODULE, "record_list", object_id, caller, || {
            self.repo
                .list_records(object_id, RecordPageQuery::new(offset, limit), caller)
        })
    }

    /// Case-insensitive substring search over `primary_value`, capped at 50.
    pub fn search_records(
        &self,
        object_id: &str,
        term: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<Record>> {
        observe(Level::Debug, MODULE, "record_search", object_id, caller, || {
            self.repo.search_records(object_id, term, caller)
        })
    }

    /// Deletes one record and every link touching it.
    pub fn delete_record(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        observe(Level::Info, MODULE, "record_delete", id, caller, || {
            self.repo.delete_record(id, caller)
        })
    }
}

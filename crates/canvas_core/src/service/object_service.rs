//! Object registry use-case service.

use crate::model::ids::OwnerId;
use crate::model::object::{NewObject, Object, ObjectPatch};
use crate::repo::object_repo::ObjectRepository;
use crate::repo::RepoResult;
use crate::service::observe;
use log::{info, Level};

const MODULE: &str = "object_registry";

/// Use-case service wrapper for the object registry.
pub struct ObjectService<R: ObjectRepository> {
    repo: R,
}

impl<R: ObjectRepository> ObjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one custom, non-global object owned by `caller`.
    pub fn create_object(&self, input: &NewObject, caller: OwnerId) -> RepoResult<Object> {
        observe(Level::Info, MODULE, "object_create", &input.name, caller, || {
            self.repo.create_object(input, caller)
        })
    }

    pub fn get_object(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Object>> {
        observe(Level::Debug, MODULE, "object_get", id, caller, || {
            self.repo.get_object(id, caller)
        })
    }

    pub fn list_owned_objects(&self, caller: OwnerId) -> RepoResult<Vec<Object>> {
        observe(Level::Debug, MODULE, "object_list", "-", caller, || {
            self.repo.list_owned_objects(caller)
        })
    }

    pub fn update_object(
        &self,
        id: &str,
        patch: &ObjectPatch,
        caller: OwnerId,
    ) -> RepoResult<Object> {
        observe(Level::Info, MODULE, "object_update", id, caller, || {
            self.repo.update_object(id, patch, caller)
        })
    }

    /// Deletes one object with its bindings, records, relationships and links.
    ///
    /// Returns `false` when the object is absent or invisible.
    pub fn delete_object(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        let summary = observe(Level::Info, MODULE, "object_delete", id, caller, || {
            self.repo.delete_object(id, caller)
        })?;

        let Some(summary) = summary else {
            return Ok(false);
        };
        info!(
            "event=object_delete_cascade module={MODULE} status=ok target={id} bindings={} records={} relationships={} links={}",
            summary.bindings, summary.records, summary.relationships, summary.links
        );
        Ok(true)
    }
}

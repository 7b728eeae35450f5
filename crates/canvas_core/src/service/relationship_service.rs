//! Relationship engine use-case service.

use crate::model::ids::OwnerId;
use crate::model::relationship::{
    NewLink, NewRelationship, Relationship, RelationshipLink, RelationshipPatch,
};
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::RepoResult;
use crate::service::observe;
use log::Level;

const MODULE: &str = "relationship_engine";

/// Use-case service wrapper for relationships and record links.
pub struct RelationshipService<R: RelationshipRepository> {
    repo: R,
}

impl<R: RelationshipRepository> RelationshipService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Defines one relationship; both objects must be visible to `caller`.
    pub fn create_relationship(
        &self,
        input: &NewRelationship,
        caller: OwnerId,
    ) -> RepoResult<Relationship> {
        observe(Level::Info, MODULE, "relationship_create", &input.name, caller, || {
            self.repo.create_relationship(input, caller)
        })
    }

    pub fn get_relationship(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Relationship>> {
        observe(Level::Debug, MODULE, "relationship_get", id, caller, || {
            self.repo.get_relationship(id, caller)
        })
    }

    pub fn list_relationships_for_object(
        &self,
        object_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<Relationship>> {
        observe(Level::Debug, MODULE, "relationship_list", object_id, caller, || {
            self.repo.list_relationships_for_object(object_id, caller)
        })
    }

    pub fn update_relationship(
        &self,
        id: &str,
        patch: &RelationshipPatch,
        caller: OwnerId,
    ) -> RepoResult<Relationship> {
        observe(Level::Info, MODULE, "relationship_update", id, caller, || {
            self.repo.update_relationship(id, patch, caller)
        })
    }

    pub fn delete_relationship(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        observe(Level::Info, MODULE, "relationship_delete", id, caller, || {
            self.repo.delete_relationship(id, caller)
        })
    }

    /// Links two records; endpoints must belong to the declared objects.
    pub fn link_records(&self, input: &NewLink, caller: OwnerId) -> RepoResult<RelationshipLink> {
        observe(Level::Info, MODULE, "record_link", &input.relationship_id, caller, || {
            self.repo.link_records(input, caller)
        })
    }

    /// Lists links touching `record_id` on either endpoint.
    pub fn get_related_records(
        &self,
        record_id: &str,
        relationship_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<RelationshipLink>> {
        observe(Level::Debug, MODULE, "record_related", record_id, caller, || {
            self.repo.related_records(record_id, relationship_id, caller)
        })
    }

    pub fn unlink(&self, link_id: &str, caller: OwnerId) -> RepoResult<bool> {
        observe(Level::Info, MODULE, "record_unlink", link_id, caller, || {
            self.repo.unlink(link_id, caller)
        })
    }
}

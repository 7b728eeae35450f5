//! Object-field binding use-case service.

use crate::model::ids::OwnerId;
use crate::model::object_field::{BindingPatch, NewBinding, ObjectField, ResolvedField};
use crate::repo::object_field_repo::ObjectFieldRepository;
use crate::repo::RepoResult;
use crate::service::observe;
use log::Level;

const MODULE: &str = "object_field";

/// Use-case service wrapper for object-field bindings.
pub struct ObjectFieldService<R: ObjectFieldRepository> {
    repo: R,
}

impl<R: ObjectFieldRepository> ObjectFieldService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Attaches one visible field to one owned object.
    ///
    /// # Contract
    /// - `display_order` defaults to 0; negative values are rejected.
    /// - Attaching the same field twice yields `Conflict`.
    pub fn attach_field(&self, input: &NewBinding, caller: OwnerId) -> RepoResult<ObjectField> {
        observe(Level::Info, MODULE, "field_attach", &input.object_id, caller, || {
            self.repo.attach_field(input, caller)
        })
    }

    pub fn get_binding(&self, id: &str, caller: OwnerId) -> RepoResult<Option<ObjectField>> {
        observe(Level::Debug, MODULE, "binding_get", id, caller, || {
            self.repo.get_binding(id, caller)
        })
    }

    /// Lists bindings in `display_order ASC, created_at ASC` order.
    pub fn list_bindings_for_object(
        &self,
        object_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<ObjectField>> {
        observe(Level::Debug, MODULE, "binding_list", object_id, caller, || {
            self.repo.list_bindings(object_id, caller)
        })
    }

    /// Lists bindings with their fields and effective config, in display order.
    pub fn list_resolved_fields(
        &self,
        object_id: &str,
        caller: OwnerId,
    ) -> RepoResult<Vec<ResolvedField>> {
        observe(Level::Debug, MODULE, "binding_resolve", object_id, caller, || {
            self.repo.list_resolved_fields(object_id, caller)
        })
    }

    pub fn update_binding(
        &self,
        id: &str,
        patch: &BindingPatch,
        caller: OwnerId,
    ) -> RepoResult<ObjectField> {
        observe(Level::Info, MODULE, "binding_update", id, caller, || {
            self.repo.update_binding(id, patch, caller)
        })
    }

    pub fn detach_field(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        observe(Level::Info, MODULE, "field_detach", id, caller, || {
            self.repo.detach_field(id, caller)
        })
    }
}

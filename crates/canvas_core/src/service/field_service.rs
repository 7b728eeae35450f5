//! Field library use-case service.
//!
//! # Responsibility
//! - Provide CRUD entry points over reusable field definitions.
//!
//! # Invariants
//! - System fields are readable by everyone and writable by no one.

use crate::model::field::{Field, FieldListQuery, FieldPatch, FieldScope, NewField};
use crate::model::ids::OwnerId;
use crate::repo::field_repo::FieldRepository;
use crate::repo::RepoResult;
use crate::service::observe;
use log::Level;

const MODULE: &str = "field_library";

/// Use-case service wrapper for the field library.
pub struct FieldService<R: FieldRepository> {
    repo: R,
}

impl<R: FieldRepository> FieldService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one custom field owned by `caller`.
    ///
    /// Duplicate `(name, caller)` pairs yield `Conflict`.
    pub fn create_field(&self, input: &NewField, caller: OwnerId) -> RepoResult<Field> {
        observe(Level::Info, MODULE, "field_create", &input.name, caller, || {
            self.repo.create_field(input, caller)
        })
    }

    pub fn get_field(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Field>> {
        observe(Level::Debug, MODULE, "field_get", id, caller, || {
            self.repo.get_field(id, caller)
        })
    }

    /// Lists global fields plus the caller's own, optionally filtered.
    pub fn list_fields(&self, query: &FieldListQuery, caller: OwnerId) -> RepoResult<Vec<Field>> {
        observe(Level::Debug, MODULE, "field_list", "-", caller, || {
            self.repo.list_fields(query, caller)
        })
    }

    /// Lists system-provided global fields only.
    pub fn list_global_fields(&self, caller: OwnerId) -> RepoResult<Vec<Field>> {
        self.list_fields(
            &FieldListQuery {
                scope: FieldScope::GlobalOnly,
                ..FieldListQuery::default()
            },
            caller,
        )
    }

    /// Lists the caller's custom fields only.
    pub fn list_user_fields(&self, caller: OwnerId) -> RepoResult<Vec<Field>> {
        self.list_fields(
            &FieldListQuery {
                scope: FieldScope::OwnedCustom,
                ..FieldListQuery::default()
            },
            caller,
        )
    }

    pub fn update_field(&self, id: &str, patch: &FieldPatch, caller: OwnerId) -> RepoResult<Field> {
        observe(Level::Info, MODULE, "field_update", id, caller, || {
            self.repo.update_field(id, patch, caller)
        })
    }

    /// Deletes one field. Bound fields yield `RestrictedDelete`.
    pub fn delete_field(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        observe(Level::Info, MODULE, "field_delete", id, caller, || {
            self.repo.delete_field(id, caller)
        })
    }
}

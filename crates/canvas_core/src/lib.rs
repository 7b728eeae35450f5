//! Core domain logic for the canvas object model.
//! This crate is the single source of truth for object model invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_from_config, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::application::{Application, ApplicationPatch, NewApplication};
pub use model::field::{Field, FieldListQuery, FieldPatch, FieldScope, FieldType, NewField};
pub use model::ids::{EntityKind, OwnerId};
pub use model::object::{NewObject, Object, ObjectPatch, ObjectPermissions};
pub use model::object_field::{BindingPatch, NewBinding, ObjectField, ResolvedField};
pub use model::record::{Record, RecordPage, RecordPageQuery};
pub use model::relationship::{
    NewLink, NewRelationship, Relationship, RelationshipLink, RelationshipPatch, RelationshipType,
};
pub use model::validation::ValidationError;
pub use model::JsonMap;
pub use policy::{AccessAction, DenialReason, PolicyViolation};
pub use repo::object_repo::CascadeSummary;
pub use repo::stats_repo::DashboardStats;
pub use repo::{ErrorKind, RepoError, RepoResult};
pub use service::object_model::ObjectModel;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

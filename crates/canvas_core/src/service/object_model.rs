//! One bundle of every object model service over a single connection.

use crate::repo::application_repo::SqliteApplicationRepository;
use crate::repo::field_repo::SqliteFieldRepository;
use crate::repo::object_field_repo::SqliteObjectFieldRepository;
use crate::repo::object_repo::SqliteObjectRepository;
use crate::repo::record_repo::SqliteRecordRepository;
use crate::repo::relationship_repo::SqliteRelationshipRepository;
use crate::repo::stats_repo::SqliteStatsRepository;
use crate::repo::RepoResult;
use crate::service::application_service::ApplicationService;
use crate::service::dashboard_service::DashboardService;
use crate::service::field_service::FieldService;
use crate::service::object_field_service::ObjectFieldService;
use crate::service::object_service::ObjectService;
use crate::service::record_service::RecordService;
use crate::service::relationship_service::RelationshipService;
use rusqlite::Connection;

/// SQLite-backed services sharing one connection.
///
/// Build once per connection and pass by reference; no service holds
/// process-wide state.
pub struct ObjectModel<'conn> {
    pub fields: FieldService<SqliteFieldRepository<'conn>>,
    pub objects: ObjectService<SqliteObjectRepository<'conn>>,
    pub bindings: ObjectFieldService<SqliteObjectFieldRepository<'conn>>,
    pub records: RecordService<SqliteRecordRepository<'conn>>,
    pub relationships: RelationshipService<SqliteRelationshipRepository<'conn>>,
    pub applications: ApplicationService<SqliteApplicationRepository<'conn>>,
    pub dashboard: DashboardService<SqliteStatsRepository<'conn>>,
}

impl<'conn> ObjectModel<'conn> {
    /// Builds every service, rejecting unmigrated or misconfigured connections.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            fields: FieldService::new(SqliteFieldRepository::try_new(conn)?),
            objects: ObjectService::new(SqliteObjectRepository::try_new(conn)?),
            bindings: ObjectFieldService::new(SqliteObjectFieldRepository::try_new(conn)?),
            records: RecordService::new(SqliteRecordRepository::try_new(conn)?),
            relationships: RelationshipService::new(SqliteRelationshipRepository::try_new(conn)?),
            applications: ApplicationService::new(SqliteApplicationRepository::try_new(conn)?),
            dashboard: DashboardService::new(SqliteStatsRepository::try_new(conn)?),
        })
    }
}

//! Application repository contracts and SQLite implementation.
//!
//! Applications are private to their creator for every action.

use crate::model::application::{Application, ApplicationPatch, NewApplication};
use crate::model::ids::{EntityKind, OwnerId};
use crate::model::validation::ValidationError;
use crate::policy;
use crate::repo::support::{
    ensure_connection_ready, now_epoch_ms, owner_text, parse_json_map, parse_owner, to_json_text,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{named_params, params, Connection, Row, Transaction, TransactionBehavior};

const APPLICATION_COLUMNS_SQL: &str = "a.id,
    a.name,
    a.label,
    a.description,
    a.icon,
    a.config,
    a.created_by,
    a.created_at,
    a.updated_at,
    a.published_at";

/// Repository interface for applications.
pub trait ApplicationRepository {
    fn create_application(
        &self,
        input: &NewApplication,
        caller: OwnerId,
    ) -> RepoResult<Application>;
    fn get_application(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Application>>;
    /// Lists the caller's applications, most recently updated first.
    fn list_applications(&self, caller: OwnerId) -> RepoResult<Vec<Application>>;
    fn update_application(
        &self,
        id: &str,
        patch: &ApplicationPatch,
        caller: OwnerId,
    ) -> RepoResult<Application>;
    /// Stamps `published_at` with the current time.
    fn publish_application(&self, id: &str, caller: OwnerId) -> RepoResult<Application>;
    fn delete_application(&self, id: &str, caller: OwnerId) -> RepoResult<bool>;
}

/// SQLite-backed application repository.
pub struct SqliteApplicationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteApplicationRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["applications"])?;
        Ok(Self { conn })
    }
}

impl ApplicationRepository for SqliteApplicationRepository<'_> {
    fn create_application(
        &self,
        input: &NewApplication,
        caller: OwnerId,
    ) -> RepoResult<Application> {
        input.validate()?;

        let now = now_epoch_ms();
        let application = Application {
            id: EntityKind::Application.new_id(),
            name: input.name.clone(),
            label: input.label.clone(),
            description: input.description.clone(),
            icon: input.icon.clone(),
            config: input.config.clone(),
            created_by: Some(caller),
            created_at: now,
            updated_at: now,
            published_at: None,
        };
        self.conn.execute(
            "INSERT INTO applications (
                id,
                name,
                label,
                description,
                icon,
                config,
                created_by,
                created_at,
                updated_at,
                published_at
            ) VALUES (
                :id, :name, :label, :description, :icon, :config, :caller, :now, :now, NULL
            );",
            named_params! {
                ":id": application.id,
                ":name": application.name,
                ":label": application.label,
                ":description": application.description,
                ":icon": application.icon,
                ":config": to_json_text(&application.config, "applications.config")?,
                ":caller": owner_text(caller),
                ":now": now,
            },
        )?;
        Ok(application)
    }

    fn get_application(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Application>> {
        load_owned_application(self.conn, id, caller)
    }

    fn list_applications(&self, caller: OwnerId) -> RepoResult<Vec<Application>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS_SQL}
             FROM applications a
             WHERE {}
             ORDER BY a.updated_at DESC, a.rowid DESC;",
            policy::owned_sql("a")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(named_params! { ":caller": owner_text(caller) })?;

        let mut applications = Vec::new();
        while let Some(row) = rows.next()? {
            applications.push(parse_application_row(row)?);
        }
        Ok(applications)
    }

    fn update_application(
        &self,
        id: &str,
        patch: &ApplicationPatch,
        caller: OwnerId,
    ) -> RepoResult<Application> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut application = load_owned_application(&tx, id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Application, id))?;
        patch.apply_to(&mut application)?;
        application.updated_at = now_epoch_ms();

        tx.execute(
            "UPDATE applications
             SET name = :name,
                 label = :label,
                 description = :description,
                 icon = :icon,
                 config = :config,
                 updated_at = :updated_at
             WHERE id = :id;",
            named_params! {
                ":id": application.id,
                ":name": application.name,
                ":label": application.label,
                ":description": application.description,
                ":icon": application.icon,
                ":config": to_json_text(&application.config, "applications.config")?,
                ":updated_at": application.updated_at,
            },
        )?;

        tx.commit()?;
        Ok(application)
    }

    fn publish_application(&self, id: &str, caller: OwnerId) -> RepoResult<Application> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut application = load_owned_application(&tx, id, caller)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Application, id))?;
        let now = now_epoch_ms();
        application.published_at = Some(now);
        application.updated_at = now;

        tx.execute(
            "UPDATE applications
             SET published_at = ?2,
                 updated_at = ?2
             WHERE id = ?1;",
            params![application.id, now],
        )?;

        tx.commit()?;
        Ok(application)
    }

    fn delete_application(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM applications
                 WHERE id = :id
                   AND {};",
                policy::owned_sql("applications")
            ),
            named_params! {
                ":id": id,
                ":caller": owner_text(caller),
            },
        )?;
        Ok(changed > 0)
    }
}

fn load_owned_application(
    conn: &Connection,
    id: &str,
    caller: OwnerId,
) -> RepoResult<Option<Application>> {
    let sql = format!(
        "SELECT {APPLICATION_COLUMNS_SQL}
         FROM applications a
         WHERE a.id = :id
           AND {};",
        policy::owned_sql("a")
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(named_params! {
        ":id": id,
        ":caller": owner_text(caller),
    })?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_application_row(row)?));
    }
    Ok(None)
}

fn parse_application_row(row: &Row<'_>) -> RepoResult<Application> {
    let config_text: String = row.get(5)?;
    Ok(Application {
        id: row.get(0)?,
        name: row.get(1)?,
        label: row.get(2)?,
        description: row.get(3)?,
        icon: row.get(4)?,
        config: parse_json_map(&config_text, "applications.config")?,
        created_by: parse_owner(row.get(6)?, "applications.created_by")?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        published_at: row.get(9)?,
    })
}

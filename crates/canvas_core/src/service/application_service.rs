//! Application use-case service.

use crate::model::application::{Application, ApplicationPatch, NewApplication};
use crate::model::ids::OwnerId;
use crate::repo::application_repo::ApplicationRepository;
use crate::repo::RepoResult;
use crate::service::observe;
use log::Level;

const MODULE: &str = "application";

pub struct ApplicationService<R: ApplicationRepository> {
    repo: R,
}

impl<R: ApplicationRepository> ApplicationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_application(
        &self,
        input: &NewApplication,
        caller: OwnerId,
    ) -> RepoResult<Application> {
        observe(Level::Info, MODULE, "application_create", &input.name, caller, || {
            self.repo.create_application(input, caller)
        })
    }

    pub fn get_application(&self, id: &str, caller: OwnerId) -> RepoResult<Option<Application>> {
        observe(Level::Debug, MODULE, "application_get", id, caller, || {
            self.repo.get_application(id, caller)
        })
    }

    pub fn list_user_applications(&self, caller: OwnerId) -> RepoResult<Vec<Application>> {
        observe(Level::Debug, MODULE, "application_list", "-", caller, || {
            self.repo.list_applications(caller)
        })
    }

    pub fn update_application(
        &self,
        id: &str,
        patch: &ApplicationPatch,
        caller: OwnerId,
    ) -> RepoResult<Application> {
        observe(Level::Info, MODULE, "application_update", id, caller, || {
            self.repo.update_application(id, patch, caller)
        })
    }

    /// Marks the application published; re-publishing refreshes `published_at`.
    pub fn publish_application(&self, id: &str, caller: OwnerId) -> RepoResult<Application> {
        observe(Level::Info, MODULE, "application_publish", id, caller, || {
            self.repo.publish_application(id, caller)
        })
    }

    pub fn delete_application(&self, id: &str, caller: OwnerId) -> RepoResult<bool> {
        observe(Level::Info, MODULE, "application_delete", id, caller, || {
            self.repo.delete_application(id, caller)
        })
    }
}

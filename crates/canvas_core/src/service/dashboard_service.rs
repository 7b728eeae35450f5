//! Dashboard statistics service.

use crate::model::ids::OwnerId;
use crate::repo::stats_repo::{DashboardStats, StatsRepository};
use crate::repo::RepoResult;
use crate::service::observe;
use log::Level;

pub struct DashboardService<R: StatsRepository> {
    repo: R,
}

impl<R: StatsRepository> DashboardService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Reads all dashboard counters from one snapshot.
    pub fn dashboard_stats(&self, caller: OwnerId) -> RepoResult<DashboardStats> {
        observe(Level::Debug, "dashboard", "dashboard_stats", "-", caller, || {
            self.repo.dashboard_stats(caller)
        })
    }
}

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    models::{JobRef, RepoSlug, RunListing, RunRef},
    Result,
};

/// Where runs, jobs and their logs come from
///
/// The GitHub API is one implementation; dry runs use canned fixture data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Successful runs of workflows named `workflow` created on `date`
    ///
    /// Workflows that fail to list are reported in `RunListing::errors`; an
    /// `Err` means nothing could be listed at all.
    async fn list_runs(&self, repo: &RepoSlug, date: NaiveDate, workflow: &str)
        -> Result<RunListing>;

    /// Successful jobs of a run
    async fn list_jobs(&self, repo: &RepoSlug, run: &RunRef) -> Result<Vec<JobRef>>;

    /// Raw log text of a job
    async fn fetch_log(&self, repo: &RepoSlug, job: &JobRef) -> Result<String>;
}

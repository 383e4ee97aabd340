// Canned data for --dry-run: one run, one job, one log, no network
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    models::{JobRef, RepoSlug, RunListing, RunRef},
    source::JobSource,
    Error, Result,
};

const FIXTURE_LOG: &str = include_str!("../../fixtures/dry_run.log");
const FIXTURE_RUN_ID: u64 = 123456789;
const FIXTURE_JOB_ID: u64 = 987654321;
const FIXTURE_CREATED_AT: &str = "2024-12-30T10:30:00Z";

pub struct FixtureSource {
    run: RunRef,
    job: JobRef,
}

impl FixtureSource {
    pub fn new(workflow: &str) -> Self {
        let created_at = DateTime::parse_from_rfc3339(FIXTURE_CREATED_AT)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default();

        Self {
            run: RunRef {
                id: FIXTURE_RUN_ID,
                name: "Build".to_string(),
                workflow_name: workflow.to_string(),
                created_at,
                head_branch: Some("main".to_string()),
            },
            job: JobRef {
                id: FIXTURE_JOB_ID,
                run_id: FIXTURE_RUN_ID,
                name: "build".to_string(),
                conclusion: Some("success".to_string()),
            },
        }
    }

    /// The raw log served for the fixture job
    pub fn log_text() -> &'static str {
        FIXTURE_LOG
    }
}

#[async_trait]
impl JobSource for FixtureSource {
    // The date is ignored so a dry run always has something to show
    async fn list_runs(
        &self,
        _repo: &RepoSlug,
        _date: NaiveDate,
        _workflow: &str,
    ) -> Result<RunListing> {
        Ok(RunListing::complete(vec![self.run.clone()]))
    }

    async fn list_jobs(&self, _repo: &RepoSlug, run: &RunRef) -> Result<Vec<JobRef>> {
        if run.id == self.run.id {
            Ok(vec![self.job.clone()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn fetch_log(&self, _repo: &RepoSlug, job: &JobRef) -> Result<String> {
        if job.id == self.job.id {
            Ok(FIXTURE_LOG.to_string())
        } else {
            Err(Error::LogUnavailable { job_id: job.id })
        }
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use ghdeps_parser::DependencyReport;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// `owner/name` of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    /// Parse `https://github.com/owner/repo[.git][/...]` or a bare `owner/repo`
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let invalid = || Error::InvalidRepositoryUrl(input.to_string());

        let path = if input.contains("://") {
            let url = Url::parse(input).map_err(|_| invalid())?;
            match url.host_str() {
                Some("github.com") | Some("www.github.com") => {}
                _ => return Err(invalid()),
            }
            url.path().to_string()
        } else if let Some(rest) = input.strip_prefix("github.com/") {
            rest.to_string()
        } else {
            input.to_string()
        };

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next().ok_or_else(invalid)?;
        let name = segments.next().ok_or_else(invalid)?;
        let name = name.strip_suffix(".git").unwrap_or(name);

        let valid = |s: &str| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(owner) || !valid(name) {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A workflow run picked for processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRef {
    pub id: u64,
    pub name: String,
    pub workflow_name: String,
    pub created_at: DateTime<Utc>,
    pub head_branch: Option<String>,
}

/// Runs found for a day, plus the workflows whose runs could not be listed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunListing {
    pub runs: Vec<RunRef>,
    /// One message per failed workflow, naming it
    pub errors: Vec<String>,
}

impl RunListing {
    pub fn complete(runs: Vec<RunRef>) -> Self {
        Self {
            runs,
            errors: Vec::new(),
        }
    }
}

/// A job inside a run whose log we want
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRef {
    pub id: u64,
    pub run_id: u64,
    pub name: String,
    pub conclusion: Option<String>,
}

/// One entry of the output `runs` array
///
/// Job fields are null when the run's job list itself could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub run_id: u64,
    pub run_name: String,
    pub workflow_name: String,
    pub created_at: DateTime<Utc>,
    pub head_branch: Option<String>,
    pub job_id: Option<u64>,
    pub job_name: Option<String>,
    pub job_conclusion: Option<String>,
    pub dependencies: DependencyReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn parsed(run: &RunRef, job: &JobRef, dependencies: DependencyReport) -> Self {
        Self {
            job_id: Some(job.id),
            job_name: Some(job.name.clone()),
            job_conclusion: job.conclusion.clone(),
            dependencies,
            ..Self::for_run(run)
        }
    }

    pub fn job_failed(run: &RunRef, job: &JobRef, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::parsed(run, job, DependencyReport::default())
        }
    }

    pub fn run_failed(run: &RunRef, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::for_run(run)
        }
    }

    fn for_run(run: &RunRef) -> Self {
        Self {
            run_id: run.id,
            run_name: run.name.clone(),
            workflow_name: run.workflow_name.clone(),
            created_at: run.created_at,
            head_branch: run.head_branch.clone(),
            job_id: None,
            job_name: None,
            job_conclusion: None,
            dependencies: DependencyReport::default(),
            error: None,
        }
    }
}

/// The whole JSON document written by the tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub repository: String,
    pub date: NaiveDate,
    pub runs: Vec<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportDocument {
    pub fn new(repository: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            repository: repository.into(),
            date,
            runs: Vec::new(),
            error: None,
        }
    }

    /// Entries that carry an error
    pub fn failed_count(&self) -> usize {
        self.runs.iter().filter(|r| r.error.is_some()).count()
    }
}

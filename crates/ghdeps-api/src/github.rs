use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::{is_retryable_status, with_retry, RetryConfig, Retryable};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: u32 = 100;
/// Stop paginating after this many pages (10k items)
const MAX_PAGES: u32 = 100;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Rate limit exceeded{}", reset_hint(.reset_at))]
    RateLimitExceeded {
        /// Unix time the quota resets, when GitHub told us
        reset_at: Option<i64>,
        /// Secondary (abuse) limits clear after a short wait
        secondary: bool,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn reset_hint(reset_at: &Option<i64>) -> String {
    match reset_at.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
        Some(at) => format!(" (resets at {})", at.to_rfc3339()),
        None => String::new(),
    }
}

impl Retryable for GitHubError {
    fn is_retryable(&self) -> bool {
        match self {
            GitHubError::RequestFailed { status, .. } => StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            GitHubError::RateLimitExceeded { secondary, .. } => *secondary,
            GitHubError::NetworkError(e) => !e.is_decode() && !e.is_builder(),
            GitHubError::NotFound(_)
            | GitHubError::AuthenticationFailed(_)
            | GitHubError::ParseError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Turn a non-success response into the matching error
///
/// `what` names the resource for not-found messages.
pub(crate) fn classify_failure(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    what: &str,
) -> GitHubError {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let remaining = header("x-ratelimit-remaining");
    let reset_at = header("x-ratelimit-reset").and_then(|v| v.parse::<i64>().ok());
    let retry_after = header("retry-after").is_some();

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (remaining == Some("0") || retry_after))
    {
        return GitHubError::RateLimitExceeded {
            reset_at,
            secondary: status == StatusCode::TOO_MANY_REQUESTS || retry_after,
        };
    }

    match status {
        StatusCode::UNAUTHORIZED => {
            GitHubError::AuthenticationFailed("bad or expired token".to_string())
        }
        StatusCode::FORBIDDEN => {
            GitHubError::AuthenticationFailed(format!("access to {} denied", what))
        }
        StatusCode::NOT_FOUND | StatusCode::GONE => GitHubError::NotFound(what.to_string()),
        _ => GitHubError::RequestFailed {
            status: status.as_u16(),
            message: truncate_body(body),
        },
    }
}

fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// One page of a GitHub list endpoint
trait Page: DeserializeOwned {
    type Item;
    fn total_count(&self) -> u64;
    fn into_items(self) -> Vec<Self::Item>;
}

#[derive(Debug, Deserialize)]
struct WorkflowsPage {
    total_count: u64,
    workflows: Vec<Workflow>,
}

impl Page for WorkflowsPage {
    type Item = Workflow;
    fn total_count(&self) -> u64 {
        self.total_count
    }
    fn into_items(self) -> Vec<Workflow> {
        self.workflows
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsPage {
    total_count: u64,
    workflow_runs: Vec<WorkflowRun>,
}

impl Page for WorkflowRunsPage {
    type Item = WorkflowRun;
    fn total_count(&self) -> u64 {
        self.total_count
    }
    fn into_items(self) -> Vec<WorkflowRun> {
        self.workflow_runs
    }
}

#[derive(Debug, Deserialize)]
struct JobsPage {
    total_count: u64,
    jobs: Vec<WorkflowJob>,
}

impl Page for JobsPage {
    type Item = WorkflowJob;
    fn total_count(&self) -> u64 {
        self.total_count
    }
    fn into_items(self) -> Vec<WorkflowJob> {
        self.jobs
    }
}

/// GitHub Actions API client
pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_BASE.to_string())
    }

    /// For GitHub Enterprise or testing against a local server
    pub fn with_base_url(token: Option<String>, base_url: String) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ghdeps/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            token: token.filter(|t| !t.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::default(),
        })
    }

    /// Swap the retry policy
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET a URL and return the body, mapping failures onto `GitHubError`
    async fn get_text(&self, url: &str, query: &[(&str, String)], what: &str) -> Result<String> {
        with_retry(&self.retry_config, || async {
            let response = self.get(url).query(query).send().await?;
            let status = response.status();

            if !status.is_success() {
                let headers = response.headers().clone();
                let body = response.text().await.unwrap_or_default();
                return Err(classify_failure(status, &headers, &body, what));
            }

            Ok(response.text().await?)
        })
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let body = self.get_text(url, query, what).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Walk every page of a list endpoint
    async fn paginate<P: Page>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let mut params = query.to_vec();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            let response: P = self.get_json(url, &params, what).await?;
            let total = response.total_count();
            let batch = response.into_items();
            let batch_len = batch.len();
            items.extend(batch);

            debug!("{}: page {} gave {} items ({} of {})", what, page, batch_len, items.len(), total);

            if batch_len < PER_PAGE as usize || items.len() as u64 >= total {
                break;
            }

            page += 1;

            if page > MAX_PAGES {
                warn!("{}: stopping after {} pages", what, MAX_PAGES);
                break;
            }
        }

        Ok(items)
    }

    /// List all workflows in a repository
    ///
    /// Endpoint: GET /repos/{owner}/{repo}/actions/workflows
    pub async fn list_workflows(&self, owner: &str, repo: &str) -> Result<Vec<Workflow>> {
        let url = format!("{}/repos/{}/{}/actions/workflows", self.base_url, owner, repo);
        let what = format!("workflows of {}/{}", owner, repo);
        self.paginate::<WorkflowsPage>(&url, &[], &what).await
    }

    /// List runs of one workflow created on a given day
    ///
    /// Endpoint: GET /repos/{owner}/{repo}/actions/workflows/{id}/runs
    /// `created` takes GitHub search syntax, e.g. `2025-07-04`.
    pub async fn list_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        workflow_id: u64,
        created: &str,
        status: Option<&str>,
    ) -> Result<Vec<WorkflowRun>> {
        let url = format!(
            "{}/repos/{}/{}/actions/workflows/{}/runs",
            self.base_url, owner, repo, workflow_id
        );
        let what = format!("runs of workflow {}", workflow_id);

        let mut query = vec![("created", created.to_string())];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }

        self.paginate::<WorkflowRunsPage>(&url, &query, &what).await
    }

    /// List the jobs of a workflow run (latest attempt only)
    ///
    /// Endpoint: GET /repos/{owner}/{repo}/actions/runs/{run_id}/jobs
    pub async fn list_run_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<Vec<WorkflowJob>> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs/{}/jobs",
            self.base_url, owner, repo, run_id
        );
        let what = format!("jobs of run {}", run_id);
        let query = [("filter", "latest".to_string())];
        self.paginate::<JobsPage>(&url, &query, &what).await
    }

    /// Download the plain-text log of a job
    ///
    /// Endpoint: GET /repos/{owner}/{repo}/actions/jobs/{job_id}/logs
    /// GitHub answers with a redirect to blob storage, which reqwest follows.
    pub async fn download_job_log(&self, owner: &str, repo: &str, job_id: u64) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/actions/jobs/{}/logs",
            self.base_url, owner, repo, job_id
        );
        let what = format!("log of job {}", job_id);
        self.get_text(&url, &[], &what).await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub name: Option<String>,
    pub workflow_id: u64,
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: String,
    pub status: Option<String>,
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: u64,
    pub run_id: u64,
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

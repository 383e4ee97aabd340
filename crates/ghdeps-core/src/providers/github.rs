// GitHub provider - bridges the Actions API client with the JobSource trait
use async_trait::async_trait;
use chrono::NaiveDate;
use ghdeps_api::{GitHubClient, GitHubError, WorkflowJob, WorkflowRun};
use tracing::{debug, info, warn};

use crate::{
    models::{JobRef, RepoSlug, RunListing, RunRef},
    source::JobSource,
    Error, Result,
};

const SUCCESS: &str = "success";

/// Wrapper around GitHubClient that implements JobSource
pub struct GitHubSource {
    client: GitHubClient,
}

impl GitHubSource {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobSource for GitHubSource {
    async fn list_runs(
        &self,
        repo: &RepoSlug,
        date: NaiveDate,
        workflow: &str,
    ) -> Result<RunListing> {
        let workflows = self.client.list_workflows(&repo.owner, &repo.name).await?;
        let matching: Vec<_> = workflows.into_iter().filter(|w| w.name == workflow).collect();

        if matching.is_empty() {
            info!("No workflow named {:?} in {}", workflow, repo);
            return Ok(RunListing::default());
        }

        let created = date.format("%Y-%m-%d").to_string();
        let mut listing = RunListing::default();
        let mut first_error = None;

        for wf in &matching {
            debug!("Listing runs of workflow {} ({})", wf.name, wf.id);
            match self
                .client
                .list_workflow_runs(&repo.owner, &repo.name, wf.id, &created, Some(SUCCESS))
                .await
            {
                Ok(found) => listing.runs.extend(
                    found
                        .into_iter()
                        .filter(|r| is_successful_on(r, date))
                        .map(|r| run_to_ref(r, &wf.name)),
                ),
                Err(e) => {
                    warn!("Could not list runs for workflow {} ({}): {}", wf.name, wf.id, e);
                    listing
                        .errors
                        .push(format!("workflow {} ({}): {}", wf.name, wf.id, e));
                    first_error.get_or_insert(e);
                }
            }
        }

        // Only give up when no workflow could be listed at all
        if listing.errors.len() == matching.len() {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        Ok(listing)
    }

    async fn list_jobs(&self, repo: &RepoSlug, run: &RunRef) -> Result<Vec<JobRef>> {
        let jobs = self
            .client
            .list_run_jobs(&repo.owner, &repo.name, run.id)
            .await?;

        Ok(jobs
            .into_iter()
            .filter(|j| j.conclusion.as_deref() == Some(SUCCESS))
            .map(job_to_ref)
            .collect())
    }

    async fn fetch_log(&self, repo: &RepoSlug, job: &JobRef) -> Result<String> {
        self.client
            .download_job_log(&repo.owner, &repo.name, job.id)
            .await
            .map_err(|e| match e {
                GitHubError::NotFound(_) => Error::LogUnavailable { job_id: job.id },
                other => other.into(),
            })
    }
}

/// The API filter is by day in UTC; double check it and the conclusion
fn is_successful_on(run: &WorkflowRun, date: NaiveDate) -> bool {
    run.conclusion.as_deref() == Some(SUCCESS) && run.created_at.date_naive() == date
}

fn run_to_ref(run: WorkflowRun, workflow_name: &str) -> RunRef {
    RunRef {
        id: run.id,
        name: run.name.unwrap_or_else(|| workflow_name.to_string()),
        workflow_name: workflow_name.to_string(),
        created_at: run.created_at,
        head_branch: run.head_branch,
    }
}

fn job_to_ref(job: WorkflowJob) -> JobRef {
    JobRef {
        id: job.id,
        run_id: job.run_id,
        name: job.name,
        conclusion: job.conclusion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ghdeps_api::RetryConfig;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one canned response per connection, recording request lines
    async fn serve(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let text = String::from_utf8_lossy(&request);
                let line = text.lines().next().unwrap_or_default().to_string();
                recorder.lock().unwrap().push(line);
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}", addr), seen)
    }

    fn ok_json(body: &str) -> String {
        respond("200 OK", body)
    }

    fn respond(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn source_for(base: String) -> GitHubSource {
        let client = GitHubClient::with_base_url(Some("test_token".to_string()), base)
            .unwrap()
            .with_retry_config(RetryConfig::none());
        GitHubSource::new(client)
    }

    fn repo() -> RepoSlug {
        RepoSlug::parse("octo/demo").unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 4).unwrap()
    }

    const WORKFLOWS: &str = r#"{"total_count":3,"workflows":[
        {"id":1,"name":"CI","path":".github/workflows/ci.yml","state":"active"},
        {"id":2,"name":"CI","path":".github/workflows/ci-linux.yml","state":"active"},
        {"id":3,"name":"Docs","path":".github/workflows/docs.yml","state":"active"}]}"#;

    const RUNS: &str = r#"{"total_count":2,"workflow_runs":[
        {"id":20,"name":"CI","workflow_id":2,"head_branch":"main","head_sha":"abc",
         "status":"completed","conclusion":"success","created_at":"2025-07-04T08:00:00Z"},
        {"id":21,"name":"CI","workflow_id":2,"head_branch":"main","head_sha":"def",
         "status":"completed","conclusion":"success","created_at":"2025-07-05T00:10:00Z"}]}"#;

    fn api_run(conclusion: Option<&str>, day: u32) -> WorkflowRun {
        WorkflowRun {
            id: 10,
            name: None,
            workflow_id: 3,
            head_branch: Some("main".to_string()),
            head_sha: "abc123".to_string(),
            status: Some("completed".to_string()),
            conclusion: conclusion.map(str::to_string),
            created_at: Utc.with_ymd_and_hms(2025, 7, day, 23, 59, 0).unwrap(),
        }
    }

    #[test]
    fn test_run_filter_checks_conclusion_and_day() {
        let day = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        assert!(is_successful_on(&api_run(Some("success"), 4), day));
        assert!(!is_successful_on(&api_run(Some("failure"), 4), day));
        assert!(!is_successful_on(&api_run(None, 4), day));
        assert!(!is_successful_on(&api_run(Some("success"), 5), day));
    }

    #[test]
    fn test_unnamed_run_takes_workflow_name() {
        let run = run_to_ref(api_run(Some("success"), 4), "CI");
        assert_eq!(run.name, "CI");
        assert_eq!(run.workflow_name, "CI");
        assert_eq!(run.head_branch.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_failing_workflow_is_reported_next_to_listed_runs() {
        let (base, seen) = serve(vec![
            ok_json(WORKFLOWS),
            respond("502 Bad Gateway", "bad gateway"),
            ok_json(RUNS),
        ])
        .await;

        let listing = source_for(base).list_runs(&repo(), day(), "CI").await.unwrap();

        let ids: Vec<_> = listing.runs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![20]);
        assert_eq!(listing.errors.len(), 1);
        assert!(listing.errors[0].contains("workflow CI (1)"), "{}", listing.errors[0]);
        assert!(listing.errors[0].contains("502"), "{}", listing.errors[0]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[1].contains("/actions/workflows/1/runs?"));
        assert!(seen[1].contains("created=2025-07-04"));
        assert!(seen[1].contains("status=success"));
        assert!(seen[2].contains("/actions/workflows/2/runs?"));
    }

    #[tokio::test]
    async fn test_all_matching_workflows_failing_is_an_error() {
        let one = r#"{"total_count":1,"workflows":[{"id":1,"name":"CI","path":"ci.yml","state":"active"}]}"#;
        let (base, _) = serve(vec![
            ok_json(one),
            respond("500 Internal Server Error", "oops"),
        ])
        .await;

        let result = source_for(base).list_runs(&repo(), day(), "CI").await;
        assert!(matches!(result, Err(Error::ApiError(ref msg)) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_no_matching_workflow_lists_nothing() {
        let (base, seen) = serve(vec![ok_json(WORKFLOWS)]).await;

        let listing = source_for(base)
            .list_runs(&repo(), day(), "Nightly")
            .await
            .unwrap();

        assert!(listing.runs.is_empty());
        assert!(listing.errors.is_empty());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_only_successful_jobs_are_kept() {
        let jobs = r#"{"total_count":3,"jobs":[
            {"id":30,"run_id":20,"name":"linux","status":"completed","conclusion":"success"},
            {"id":31,"run_id":20,"name":"windows","status":"completed","conclusion":"failure"},
            {"id":32,"run_id":20,"name":"macos","status":"in_progress","conclusion":null}]}"#;
        let (base, seen) = serve(vec![ok_json(jobs)]).await;
        let run = RunRef {
            id: 20,
            name: "CI".to_string(),
            workflow_name: "CI".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 7, 4, 8, 0, 0).unwrap(),
            head_branch: Some("main".to_string()),
        };

        let jobs = source_for(base).list_jobs(&repo(), &run).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, 30);
        assert_eq!(jobs[0].name, "linux");
        assert!(seen.lock().unwrap()[0].contains("/actions/runs/20/jobs?"));
    }

    #[tokio::test]
    async fn test_missing_log_is_log_unavailable() {
        let (base, seen) = serve(vec![respond(
            "404 Not Found",
            r#"{"message":"Not Found"}"#,
        )])
        .await;
        let job = JobRef {
            id: 30,
            run_id: 20,
            name: "linux".to_string(),
            conclusion: Some("success".to_string()),
        };

        let result = source_for(base).fetch_log(&repo(), &job).await;

        assert!(matches!(result, Err(Error::LogUnavailable { job_id: 30 })));
        assert!(seen.lock().unwrap()[0].contains("/repos/octo/demo/actions/jobs/30/logs"));
    }

    #[tokio::test]
    async fn test_log_text_is_returned() {
        let (base, _) = serve(vec![format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            12, "-- line one\n"
        )])
        .await;
        let job = JobRef {
            id: 30,
            run_id: 20,
            name: "linux".to_string(),
            conclusion: Some("success".to_string()),
        };

        let log = source_for(base).fetch_log(&repo(), &job).await.unwrap();
        assert_eq!(log, "-- line one\n");
    }
}

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    models::{JobResult, RepoSlug, ReportDocument},
    source::JobSource,
};

/// Resolve the repository URL and run the pipeline
///
/// Never fails: a bad URL ends up as the document's `error`.
pub async fn process_repository<S: JobSource + ?Sized>(
    source: &S,
    url: &str,
    date: NaiveDate,
    workflow: &str,
) -> ReportDocument {
    match RepoSlug::parse(url) {
        Ok(repo) => assemble(source, &repo, date, workflow).await,
        Err(e) => {
            warn!("{}", e);
            ReportDocument {
                error: Some(e.to_string()),
                ..ReportDocument::new(url, date)
            }
        }
    }
}

/// Fetch every successful job of the day, parse its log and collect results
///
/// Runs and jobs are handled one after another. A failing run or job is
/// recorded with its error and the rest carry on.
pub async fn assemble<S: JobSource + ?Sized>(
    source: &S,
    repo: &RepoSlug,
    date: NaiveDate,
    workflow: &str,
) -> ReportDocument {
    let mut doc = ReportDocument::new(repo.to_string(), date);

    info!("Processing repository {} for {} (workflow {:?})", repo, date, workflow);

    let listing = match source.list_runs(repo, date, workflow).await {
        Ok(listing) => listing,
        Err(e) => {
            warn!("Could not list runs for {}: {}", repo, e);
            doc.error = Some(e.to_string());
            return doc;
        }
    };

    if !listing.errors.is_empty() {
        warn!(
            "Runs of {} workflow(s) could not be listed",
            listing.errors.len()
        );
        doc.error = Some(listing.errors.join("; "));
    }

    let runs = listing.runs;
    info!("Found {} successful runs", runs.len());

    for run in &runs {
        let jobs = match source.list_jobs(repo, run).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(run_id = run.id, "Could not list jobs: {}", e);
                doc.runs
                    .push(JobResult::run_failed(run, format!("run {}: {}", run.id, e)));
                continue;
            }
        };

        for job in &jobs {
            info!(
                "Processing job {} ({}) from run {}: {}",
                job.id, job.name, run.id, run.name
            );

            match source.fetch_log(repo, job).await {
                Ok(log) => {
                    let report = ghdeps_parser::parse(&log);
                    if report.is_empty() {
                        info!(job_id = job.id, "No dependency report in log");
                    }
                    doc.runs.push(JobResult::parsed(run, job, report));
                }
                Err(e) => {
                    warn!(run_id = run.id, job_id = job.id, "Could not fetch log: {}", e);
                    doc.runs.push(JobResult::job_failed(
                        run,
                        job,
                        format!("run {} job {}: {}", run.id, job.id, e),
                    ));
                }
            }
        }
    }

    info!(
        "Collected {} job results ({} with errors)",
        doc.runs.len(),
        doc.failed_count()
    );

    doc
}

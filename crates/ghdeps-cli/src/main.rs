use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use ghdeps_api::{GitHubClient, RetryConfig};
use ghdeps_core::{Config, Exporter, FixtureSource, GitHubSource, JobSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ghdeps")]
#[command(version, about = "Collect CMake dependency reports from GitHub Actions job logs", long_about = None)]
struct Cli {
    /// Day whose successful runs are processed (YYYY-MM-DD, default today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Repository URL or owner/repo
    #[arg(long)]
    url: Option<String>,

    /// GitHub token; log downloads need one
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Write the JSON here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Workflow name to filter runs by
    #[arg(long)]
    workflow: Option<String>,

    /// Use built-in sample data instead of the GitHub API
    #[arg(long)]
    dry_run: bool,

    /// Config file to read instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// API base URL (GitHub Enterprise)
    #[arg(long)]
    api_url: Option<String>,
}

/// Effective options after merging flags, environment and config file
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    date: NaiveDate,
    url: String,
    token: Option<String>,
    workflow: String,
    api_url: String,
    retry: RetryConfig,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config, today: NaiveDate) -> Self {
        Self {
            date: cli.date.unwrap_or(today),
            url: cli
                .url
                .clone()
                .unwrap_or_else(|| config.defaults.repository_url.clone()),
            token: cli
                .token
                .clone()
                .or_else(|| config.github.token.clone())
                .filter(|t| !t.trim().is_empty()),
            workflow: cli
                .workflow
                .clone()
                .unwrap_or_else(|| config.defaults.workflow.clone()),
            api_url: cli
                .api_url
                .clone()
                .unwrap_or_else(|| config.github.api_url.clone()),
            retry: RetryConfig::from(&config.retry),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            // An explicit path has to exist
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Ok(Config::load_from(path)?)
        }
        None => Ok(Config::load()?),
    }
}

fn build_source(settings: &Settings, dry_run: bool) -> anyhow::Result<Box<dyn JobSource>> {
    if dry_run {
        tracing::info!("Dry run: using sample data, no network access");
        return Ok(Box::new(FixtureSource::new(&settings.workflow)));
    }

    if settings.token.is_none() {
        tracing::warn!("No GitHub token set; job log downloads will likely fail");
    }

    let client = GitHubClient::with_base_url(settings.token.clone(), settings.api_url.clone())
        .context("Failed to create GitHub client")?
        .with_retry_config(settings.retry.clone());

    Ok(Box::new(GitHubSource::new(client)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pure JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ghdeps_cli=info,ghdeps_core=info,ghdeps_api=info,ghdeps_parser=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let settings = Settings::resolve(&cli, &config, chrono::Local::now().date_naive());

    let source = build_source(&settings, cli.dry_run)?;
    let doc = ghdeps_core::process_repository(
        source.as_ref(),
        &settings.url,
        settings.date,
        &settings.workflow,
    )
    .await;

    if let Some(error) = &doc.error {
        tracing::error!("{}", error);
    }

    Exporter::write(&doc, cli.output.as_deref()).context("Failed to write results")?;

    match &cli.output {
        Some(path) => tracing::info!("Results written to {}", path.display()),
        None => tracing::debug!("Results written to stdout"),
    }

    Ok(())
}

// Fetch -> parse -> assemble pipeline for CI dependency reports
pub mod assemble;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod providers;
pub mod source;

pub use assemble::{assemble, process_repository};
pub use config::Config;
pub use error::Error;
pub use export::Exporter;
pub use models::{JobRef, JobResult, RepoSlug, ReportDocument, RunListing, RunRef};
pub use providers::{FixtureSource, GitHubSource};
pub use source::JobSource;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;

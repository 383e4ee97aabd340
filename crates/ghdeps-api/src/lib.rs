// GitHub Actions REST client
pub mod github;
pub mod retry;

// Re-export common types
pub use github::{GitHubClient, GitHubError, Workflow, WorkflowJob, WorkflowRun};
pub use retry::{RetryConfig, Retryable};

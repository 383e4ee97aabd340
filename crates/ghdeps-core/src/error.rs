use ghdeps_api::GitHubError;
use thiserror::Error;

/// All the ways a report run can go wrong
///
/// Fetch errors are recorded per job in the output document; only config and
/// output errors stop the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid repository URL: {0}")]
    InvalidRepositoryUrl(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Log unavailable for job {job_id}")]
    LogUnavailable { job_id: u64 },

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<GitHubError> for Error {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::AuthenticationFailed(msg) => Error::AuthError(msg),
            e @ GitHubError::RateLimitExceeded { .. } => Error::RateLimitExceeded(e.to_string()),
            GitHubError::NetworkError(e) => Error::NetworkError(e.to_string()),
            e @ (GitHubError::NotFound(_)
            | GitHubError::RequestFailed { .. }
            | GitHubError::ParseError(_)) => Error::ApiError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_errors_map_to_taxonomy() {
        let auth: Error = GitHubError::AuthenticationFailed("bad token".into()).into();
        assert!(matches!(auth, Error::AuthError(_)));

        let limited: Error = GitHubError::RateLimitExceeded {
            reset_at: None,
            secondary: false,
        }
        .into();
        assert!(matches!(limited, Error::RateLimitExceeded(_)));

        let missing: Error = GitHubError::NotFound("runs".into()).into();
        assert!(matches!(missing, Error::ApiError(ref msg) if msg.contains("runs")));
    }

    #[test]
    fn test_log_unavailable_names_job() {
        let err = Error::LogUnavailable { job_id: 987654321 };
        assert_eq!(err.to_string(), "Log unavailable for job 987654321");
    }
}

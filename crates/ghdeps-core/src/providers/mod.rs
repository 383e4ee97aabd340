// Job source implementations
pub mod fixture;
pub mod github;

pub use fixture::FixtureSource;
pub use github::GitHubSource;

use thiserror::Error;

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::StateError(format!("JSON serialization error: {}", err))
    }
}

impl From<octocrab::Error> for MonitorError {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubError(format!("GitHub request failed: {}", err))
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("GitHub API error: {0}")]
    GitHubError(String),

    #[error("State store error: {0}")]
    StateError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl MonitorError {
    pub fn missing_setting(name: &str) -> Self {
        Self::ConfigError(format!("{} is required but was not set", name))
    }

    pub fn graphql(messages: &[String]) -> Self {
        Self::GitHubError(format!("GraphQL query failed: {}", messages.join("; ")))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

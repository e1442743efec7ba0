//! Custom error types for gkup.

use thiserror::Error;

/// Errors that can occur while planning or applying a GKE upgrade.
#[derive(Error, Debug)]
pub enum GkupError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Specified file does not exist: {0}")]
    FileNotFound(String),

    #[error("Failed to fetch release notes feed: {0}")]
    Transport(String),

    #[error("Failed to parse release notes feed: {0}")]
    FeedParse(String),

    #[error("No matching GKE version found for minor version {minor}. Versions available are: {}", format_available(.available))]
    ResolutionFailure { minor: String, available: Vec<String> },

    #[error("{0} not found in env file")]
    MissingField(String),

    #[error("Invalid version format: {0}")]
    InvalidVersion(String),

    #[error("Cannot rewrite {0} in place: key is not a top-level plain, single- or double-quoted scalar")]
    UnsupportedLayout(String),

    #[error("Failed to parse env file: {0}")]
    Yaml(String),
}

impl GkupError {
    /// Create a transport error from any HTTP client error.
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        GkupError::Transport(err.to_string())
    }
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        format!("[{}]", available.join(", "))
    }
}

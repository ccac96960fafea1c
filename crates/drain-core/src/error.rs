//! Error types for harness configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a harness config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown body policy: {0} (expected \"leak\" or \"drain\")")]
    UnknownPolicy(String),

    #[error("unknown memory source: {0} (expected \"heap\" or \"rss\")")]
    UnknownMemorySource(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid status code: {0}")]
    InvalidStatus(u16),

    #[error("probe url must not be empty")]
    EmptyUrl,
}

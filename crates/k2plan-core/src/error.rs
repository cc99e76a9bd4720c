//! Error types for requests and operator configuration.

use thiserror::Error;

/// Result type alias for runnable request handling.
pub type RequestResult<T> = Result<T, RequestError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A runnable request that cannot be turned into a [`crate::Runnable`].
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("runnable {0} requests zero cpus")]
    NoCpus(String),

    #[error("runnable name {name} is not {component} followed by an ordinal")]
    InvalidName { name: String, component: String },

    #[error("runnable {runnable} declares argument {key} twice")]
    DuplicateArgument { runnable: String, key: String },

    #[error("runnable {runnable} uses unknown placeholder {token}")]
    UnknownPlaceholder { runnable: String, token: String },

    #[error("runnable {runnable} declares placeholder {token} more than once")]
    RepeatedPlaceholder { runnable: String, token: String },

    #[error("failed to read request file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse request file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Invalid or unreadable host inventory.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read inventory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse inventory: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render inventory: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("inventory has no hosts")]
    NoHosts,

    #[error("host {0} has no cores")]
    NoCores(String),

    #[error("host {0} is listed twice")]
    DuplicateHost(String),
}

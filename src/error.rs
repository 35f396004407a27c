use std::path::PathBuf;

/// Errors raised by the coordinator and its collaborators
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Document URI uses a scheme the coordinator does not manage
    #[error("Unsupported URI scheme '{scheme}' in '{uri}'")]
    UnsupportedScheme { scheme: String, uri: String },

    /// URI could not be parsed at all
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Project root discovery failed
    #[error("Cannot find project root for '{path}': {reason}")]
    ProjectRoot { path: PathBuf, reason: String },

    /// Session factory refused to construct a session
    #[error("Failed to create session for '{root}': {reason}")]
    SessionCreation { root: String, reason: String },

    /// Running session reported an error for a lifecycle request
    #[error("Session error: {0}")]
    Session(String),

    /// Toolchain installation failed
    #[error("Toolchain installation failed: {0}")]
    Install(String),

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

impl From<toml::de::Error> for CoordinatorError {
    fn from(error: toml::de::Error) -> Self {
        CoordinatorError::Config(error.to_string())
    }
}

impl From<toml::ser::Error> for CoordinatorError {
    fn from(error: toml::ser::Error) -> Self {
        CoordinatorError::Config(error.to_string())
    }
}

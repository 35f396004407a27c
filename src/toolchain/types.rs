use crate::env;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete toolchain version reported by a probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainVersion {
    /// Major version, compared against the managed major version
    pub major: String,
    /// Full version string when the probe reported one
    pub full: Option<String>,
}

/// Classified failure of a version probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ProbeError {
    #[error("no toolchain package manager installed")]
    PackageManagerMissing,
    #[error("toolchain not found")]
    ToolNotFound,
    #[error("{0}")]
    Other(String),
}

/// Result of checking a project root's toolchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VersionInfo {
    Detected(ToolchainVersion),
    Failed { error: ProbeError },
}

/// Outcome of a [`VersionCache`](super::VersionCache) lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLookup {
    pub info: VersionInfo,
    /// An unattended toolchain install ran while resolving this lookup
    pub installed: bool,
}

/// Configuration for the command-line version probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl ToolchainVersion {
    pub fn major(major: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            full: None,
        }
    }

    pub fn with_full(mut self, full: impl Into<String>) -> Self {
        self.full = Some(full.into());
        self
    }
}

impl ProbeError {
    /// Errors recovered by installing the toolchain
    pub fn is_not_installed(&self) -> bool {
        matches!(self, ProbeError::PackageManagerMissing | ProbeError::ToolNotFound)
    }
}

impl VersionInfo {
    pub fn detected(major: impl Into<String>) -> Self {
        VersionInfo::Detected(ToolchainVersion::major(major))
    }

    pub fn failed(error: ProbeError) -> Self {
        VersionInfo::Failed { error }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, VersionInfo::Detected(_))
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match self {
            VersionInfo::Failed { error } => Some(error),
            VersionInfo::Detected(_) => None,
        }
    }

    pub fn major(&self) -> Option<&str> {
        match self {
            VersionInfo::Detected(version) => Some(&version.major),
            VersionInfo::Failed { .. } => None,
        }
    }

    /// A concrete version was detected and it is not the managed one
    pub fn is_other_major(&self, managed_major: &str) -> bool {
        self.major().is_some_and(|major| major != managed_major)
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionInfo::Detected(version) => match &version.full {
                Some(full) => write!(f, "{}", full),
                None => write!(f, "{}", version.major),
            },
            VersionInfo::Failed { error } => write!(f, "error: {}", error),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: env::toolchain::DEFAULT_PROBE_PROGRAM.to_string(),
            args: vec!["--version".to_string()],
            timeout_secs: env::toolchain::DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

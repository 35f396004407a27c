use crate::env;
use crate::error::Result;
use crate::toolchain::ProbeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for the session coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Language id of the documents to manage
    pub language_id: String,
    /// Only roots whose toolchain has this major version get a session
    pub managed_major_version: String,
    /// Ask before installing a missing toolchain instead of installing unattended
    pub prompt_user_for_install: bool,
    pub show_invalid_project_warnings: bool,
    /// Capacity of the coordinator event channel
    pub event_buffer: usize,
    pub probe: ProbeConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            language_id: env::toolchain::DEFAULT_LANGUAGE_ID.to_string(),
            managed_major_version: env::toolchain::DEFAULT_MANAGED_MAJOR.to_string(),
            prompt_user_for_install: true,
            show_invalid_project_warnings: true,
            event_buffer: 256,
            probe: ProbeConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

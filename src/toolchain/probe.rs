//! Command-line toolchain version probe.
//!
//! Runs `<program> --version` inside the project root and classifies the
//! outcome into a [`VersionInfo`].

use crate::env;
use crate::error::{CoordinatorError, Result};
use crate::scope::Scope;
use crate::toolchain::types::*;
use crate::toolchain::ToolchainInstaller;
use async_trait::async_trait;
use regex::Regex;
use std::borrow::Cow;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use which::which;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"version\s+v?((\d+)\.\d+\.\d+[^\s,)]*)").expect("valid version pattern")
});

static BARE_VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bv?((\d+)\.\d+\.\d+[^\s,)]*)").expect("valid version pattern"));

/// Probes the toolchain by executing it
#[derive(Debug, Clone)]
pub struct CommandVersionProbe {
    config: ProbeConfig,
}

impl CommandVersionProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run the configured probe command for `root`
    pub async fn probe(&self, root: &Scope) -> VersionInfo {
        let program = match which(&self.config.program) {
            Ok(path) => path,
            Err(_) => {
                let error = if which(env::toolchain::PACKAGE_MANAGER_PROGRAM).is_err() {
                    ProbeError::PackageManagerMissing
                } else {
                    ProbeError::ToolNotFound
                };
                debug!("'{}' not on PATH: {}", self.config.program, error);
                return VersionInfo::failed(error);
            }
        };

        let mut command = Command::new(&program);
        command
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = root.path().filter(|dir| dir.is_dir()) {
            command.current_dir(dir);
        }

        debug!("Probing toolchain: {}", self.command_line(&program));

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return VersionInfo::failed(ProbeError::Other(e.to_string())),
            Err(_) => {
                warn!("Version probe timed out after {:?}", timeout);
                return VersionInfo::failed(ProbeError::Other(format!(
                    "version probe timed out after {}s",
                    self.config.timeout_secs
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return VersionInfo::failed(ProbeError::Other(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_version_output(&stdout) {
            Some(version) => {
                info!("Detected toolchain version {:?} for {}", version.full, root);
                VersionInfo::Detected(version)
            }
            None => VersionInfo::failed(ProbeError::Other(format!(
                "unrecognized version output: {}",
                stdout.trim()
            ))),
        }
    }

    fn command_line(&self, program: &Path) -> String {
        std::iter::once(program.display().to_string())
            .chain(self.config.args.iter().cloned())
            .map(|part| shell_escape::escape(Cow::Owned(part)).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Extract the toolchain version from `--version` output
pub fn parse_version_output(text: &str) -> Option<ToolchainVersion> {
    let captures = VERSION_PATTERN
        .captures(text)
        .or_else(|| BARE_VERSION_PATTERN.captures(text))?;
    Some(ToolchainVersion::major(&captures[2]).with_full(&captures[1]))
}

#[async_trait]
impl ToolchainInstaller for CommandVersionProbe {
    async fn probe_version(&self, root: &Scope) -> VersionInfo {
        self.probe(root).await
    }

    async fn default_toolchain(&self, _root: &Scope) -> Option<String> {
        None
    }

    async fn install_toolchain(&self) -> Result<()> {
        Err(CoordinatorError::Install(format!(
            "install '{}' manually; the command probe does not install toolchains",
            env::toolchain::PACKAGE_MANAGER_PROGRAM
        )))
    }

    async fn show_install_options(&self, scope: &Scope) -> Result<()> {
        info!(
            "Toolchain for {} is missing; install '{}' to continue",
            scope,
            env::toolchain::PACKAGE_MANAGER_PROGRAM
        );
        Ok(())
    }
}

pub mod cache;
pub mod probe;
pub mod types;

#[cfg(test)]
mod tests;

pub use cache::*;
pub use probe::*;
pub use types::*;

use crate::error::Result;
use crate::scope::Scope;
use async_trait::async_trait;

/// Toolchain inspection and installation, provided by the host
#[async_trait]
pub trait ToolchainInstaller: Send + Sync {
    /// Inspect the toolchain that would serve `root`
    async fn probe_version(&self, root: &Scope) -> VersionInfo;

    /// Name of the default toolchain, handed to newly constructed sessions
    async fn default_toolchain(&self, root: &Scope) -> Option<String>;

    /// Install the toolchain package manager without asking the user
    async fn install_toolchain(&self) -> Result<()>;

    /// Offer installation choices to the user. Returns once the user answered,
    /// not once an installation finished.
    async fn show_install_options(&self, scope: &Scope) -> Result<()>;
}

use crate::scope::{ProjectRootKey, Scope};
use crate::toolchain::types::*;
use crate::toolchain::ToolchainInstaller;
use crate::workspace::UserNotifier;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-root memoized toolchain versions.
///
/// Only clean detections are memoized. Entries are dropped solely through
/// [`invalidate`](Self::invalidate) and [`clear`](Self::clear).
pub struct VersionCache {
    entries: DashMap<ProjectRootKey, VersionInfo>,
    installer: Arc<dyn ToolchainInstaller>,
    notifier: Arc<dyn UserNotifier>,
    prompt_user_for_install: bool,
}

impl VersionCache {
    pub fn new(
        installer: Arc<dyn ToolchainInstaller>,
        notifier: Arc<dyn UserNotifier>,
        prompt_user_for_install: bool,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            installer,
            notifier,
            prompt_user_for_install,
        }
    }

    /// Memoized version for `root`, if any
    pub fn cached(&self, root: &Scope) -> Option<VersionInfo> {
        self.entries.get(&root.key()).map(|entry| entry.clone())
    }

    /// Resolve the version for `root`, probing and possibly installing on a miss
    pub async fn get_version(&self, root: &Scope) -> VersionLookup {
        let key = root.key();
        if let Some(hit) = self.cached(root) {
            debug!("Version cache hit for {}", key);
            return VersionLookup {
                info: hit,
                installed: false,
            };
        }

        let mut info = self.installer.probe_version(root).await;
        let mut installed = false;

        match info.error().cloned() {
            None => {
                debug!("Memoizing toolchain version {} for {}", info, key);
                self.entries.insert(key, info.clone());
            }
            Some(probe_error) if probe_error.is_not_installed() => {
                if self.prompt_user_for_install {
                    info!("Toolchain missing for {}, offering install options", root);
                    // Waits for the answer, not for the install to complete.
                    if let Err(e) = self.installer.show_install_options(root).await {
                        warn!("Failed to show install options for {}: {}", root, e);
                    }
                } else {
                    info!("Toolchain missing for {}, installing unattended", root);
                    match self.installer.install_toolchain().await {
                        Ok(()) => {
                            installed = true;
                            info = self.installer.probe_version(root).await;
                            if info.is_ok() {
                                self.entries.insert(key, info.clone());
                            }
                        }
                        Err(e) => {
                            error!("Unattended toolchain install failed: {}", e);
                            self.notifier.show_error(&e.to_string()).await;
                        }
                    }
                }
            }
            Some(probe_error) => {
                warn!("Cannot determine toolchain version for {}: {}", root, probe_error);
                self.notifier
                    .show_error(&format!(
                        "Cannot determine toolchain version: {}",
                        probe_error
                    ))
                    .await;
            }
        }

        VersionLookup { info, installed }
    }

    /// Probe without consulting or updating the memo
    pub async fn probe_uncached(&self, root: &Scope) -> VersionInfo {
        self.installer.probe_version(root).await
    }

    pub fn invalidate(&self, key: &ProjectRootKey) -> Option<VersionInfo> {
        self.entries.remove(key).map(|(_, info)| info)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

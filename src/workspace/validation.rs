use crate::env::messages;
use crate::scope::{ProjectRootKey, Scope};
use crate::workspace::{ProjectLocator, UserNotifier};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// What the advisory check concluded for a root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutAdvice {
    /// Nothing to report, or the root was already reported
    Quiet,
    /// Untitled documents run without a project
    SingleFileMode,
    /// Root is not a project and no ancestor is
    InvalidProject,
    /// Root is not a project but an ancestor is; `opened` if the user chose to open it
    AncestorProject { ancestor: std::path::PathBuf, opened: bool },
}

/// Advisory warnings about project structure. Never blocks a session.
pub struct ProjectLayoutAdvisor {
    locator: Arc<dyn ProjectLocator>,
    notifier: Arc<dyn UserNotifier>,
    enabled: bool,
    warned: Mutex<HashSet<ProjectRootKey>>,
}

impl ProjectLayoutAdvisor {
    pub fn new(
        locator: Arc<dyn ProjectLocator>,
        notifier: Arc<dyn UserNotifier>,
        enabled: bool,
    ) -> Self {
        Self {
            locator,
            notifier,
            enabled,
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Check `root` once until it is forgotten
    pub async fn check(&self, root: &Scope) -> LayoutAdvice {
        if !self.enabled || !self.first_visit(root) {
            return LayoutAdvice::Quiet;
        }

        let path = match root {
            Scope::Untitled => {
                self.notifier
                    .show_warning(
                        "Worker session operating in restricted single file mode. \
                         Open a valid project folder for full functionality.",
                    )
                    .await;
                return LayoutAdvice::SingleFileMode;
            }
            Scope::File(path) => path,
        };

        if self.locator.is_valid_project_layout(path).await {
            debug!("{} is a valid project", path.display());
            return LayoutAdvice::Quiet;
        }

        let Some(ancestor) = self.locator.find_ancestor_project_layout(path).await else {
            self.notifier
                .show_warning(&format!(
                    "Opened folder '{}' is not a valid project. \
                     Open a valid project folder for full functionality.",
                    path.display()
                ))
                .await;
            return LayoutAdvice::InvalidProject;
        };

        let message = format!(
            "Opened folder '{}' is not a valid project folder. \
             However, a valid project was found in a parent directory at '{}'. \
             Open this project instead?",
            path.display(),
            ancestor.display()
        );
        let choice = self
            .notifier
            .show_warning_with_action(&message, messages::OPEN_PARENT_PROJECT)
            .await;

        let opened = choice.as_deref() == Some(messages::OPEN_PARENT_PROJECT);
        if opened {
            info!("Opening ancestor project {}", ancestor.display());
            if let Err(e) = self.notifier.open_folder(&ancestor).await {
                warn!("Failed to open {}: {}", ancestor.display(), e);
            }
        }

        LayoutAdvice::AncestorProject { ancestor, opened }
    }

    /// Allow `root` to be reported again, e.g. after its folder was closed
    pub fn forget(&self, root: &Scope) {
        self.warned().remove(&root.key());
    }

    fn first_visit(&self, root: &Scope) -> bool {
        self.warned().insert(root.key())
    }

    fn warned(&self) -> MutexGuard<'_, HashSet<ProjectRootKey>> {
        self.warned.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

//! Editor-side collaborators and document routing.
//!
//! The coordinator never talks to an editor directly. Everything it needs to
//! know about folders, visible documents and the user is asked through the
//! traits in this module.

pub mod resolver;
pub mod validation;

pub use resolver::*;
pub use validation::*;

use crate::error::Result;
use crate::scope::{Document, Scope};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Project-root discovery and project structure validation
#[async_trait]
pub trait ProjectLocator: Send + Sync {
    /// Root of the package that owns `scope` (a file scope)
    async fn find_project_root(&self, scope: &Scope) -> Result<Scope>;

    /// Whether `root` has the files a valid project needs
    async fn is_valid_project_layout(&self, root: &Path) -> bool;

    /// Closest ancestor of `root` holding a valid project
    async fn find_ancestor_project_layout(&self, root: &Path) -> Option<PathBuf>;
}

/// Read-only view of the editor workspace
#[async_trait]
pub trait WorkspaceView: Send + Sync {
    /// Open workspace folder covering `scope`, if any
    async fn containing_folder(&self, scope: &Scope) -> Option<PathBuf>;

    /// Whether `uri` is shown in an editor. Documents opened in the
    /// background (e.g. for source control) have no editor.
    async fn is_visible(&self, uri: &Scope) -> bool;

    /// Document of the focused editor
    async fn active_document(&self) -> Option<Document>;

    async fn visible_documents(&self) -> Vec<Document>;
}

/// User-visible messages
#[async_trait]
pub trait UserNotifier: Send + Sync {
    async fn show_error(&self, message: &str);

    async fn show_warning(&self, message: &str);

    /// Show a warning with one action button; returns the action if chosen
    async fn show_warning_with_action(&self, message: &str, action: &str) -> Option<String>;

    /// Reopen the editor on `folder`
    async fn open_folder(&self, folder: &Path) -> Result<()>;
}

//! # Workspace Session Coordinator
//!
//! Keeps exactly one toolchain worker session per project root in an editor
//! workspace. Documents are routed to the session of the project that owns
//! them, sessions are created lazily and at most once per root, toolchain
//! versions are probed and memoized per root, and lifecycle events of all
//! sessions are fanned into one coordinator-wide stream.
//!
//! ## Architecture Overview
//!
//! - **[`coordinator`]**: The [`SessionCoordinator`] and its event stream
//! - **[`session`]**: Session traits, registry and pending-creation markers
//! - **[`toolchain`]**: Version probing, memoization and installation flow
//! - **[`workspace`]**: Editor-side collaborators and folder resolution
//! - **[`scope`]**: Document scopes and canonical project root keys
//!
//! The coordinator talks to the outside world only through the collaborator
//! traits ([`ProjectLocator`], [`ToolchainInstaller`], [`WorkspaceView`],
//! [`UserNotifier`], [`SessionFactory`]). The [`testing`] module provides
//! in-memory implementations of all of them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsc::testing::MockEnvironment;
//! use wsc::{CoordinatorConfig, Document, Scope};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let env = MockEnvironment::new().with_project("/work/proj");
//!     let coordinator = env.coordinator(CoordinatorConfig::default());
//!
//!     let document = Document::new(Scope::file("/work/proj/Main.lean"), "lean4");
//!     coordinator.did_open_document(&document).await;
//!
//!     let session = coordinator.find_session(&document.uri).await;
//!     println!("Session: {:?}", session.map(|s| s.id()));
//!
//!     coordinator.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Session coordination: ensure-session, install-change handling, folder
/// removal, user commands and the coordinator event stream.
pub mod coordinator;

/// Worker session abstraction and the per-root session registry.
pub mod session;

/// Toolchain version detection, memoization and installation.
pub mod toolchain;

/// Editor workspace collaborators and document-to-root resolution.
pub mod workspace;

/// Document scopes and project root keys.
pub mod scope;

/// Error types shared across the crate.
pub mod error;

/// Environment constants and path utilities.
///
/// Centralizes all hardcoded names used throughout the application for
/// easier maintenance and consistency.
pub mod env;

/// In-memory collaborators for driving a coordinator without an editor.
pub mod testing;

// CLI module for command-line interface
pub mod cli;

pub use coordinator::{
    CommandOutcome, CoordinatorConfig, CoordinatorEvent, CoordinatorEventSubscription,
    Collaborators, EnsureOutcome, SessionCoordinator,
};
pub use error::{CoordinatorError, Result};
pub use scope::{Document, ProjectRootKey, Scope};
pub use session::{SessionEvent, SessionFactory, SessionPhase, SessionSpec, WorkerSession};
pub use toolchain::{CommandVersionProbe, ProbeConfig, ToolchainInstaller, VersionInfo};
pub use workspace::{FolderResolver, ProjectLocator, UserNotifier, WorkspaceView};

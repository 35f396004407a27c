//! Environment constants and path utilities for the workspace session coordinator.
//!
//! This module centralizes the hardcoded names used throughout the crate,
//! making them easier to maintain and modify.

use std::path::{Path, PathBuf};

/// Main application directory name (hidden directory like .git, .vscode)
pub const WSC_DIR_NAME: &str = ".wsc";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up directly in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "wsc.toml";

/// System-wide configuration file (Unix-like systems)
pub const SYSTEM_CONFIG_FILE: &str = "/etc/wsc/config.toml";

/// URI and scope naming
pub mod scope {
    /// Scheme of documents backed by a file on disk
    pub const FILE_SCHEME: &str = "file";

    /// Scheme of unsaved documents
    pub const UNTITLED_SCHEME: &str = "untitled";

    /// Canonical key of the synthetic root shared by all unsaved documents
    pub const UNTITLED_ROOT_KEY: &str = "untitled:";
}

/// Toolchain defaults
pub mod toolchain {
    /// Language id of documents the coordinator manages
    pub const DEFAULT_LANGUAGE_ID: &str = "lean4";

    /// Major toolchain version the coordinator manages
    pub const DEFAULT_MANAGED_MAJOR: &str = "4";

    /// Program invoked to probe the toolchain version
    pub const DEFAULT_PROBE_PROGRAM: &str = "lean";

    /// Program that manages toolchain installations
    pub const PACKAGE_MANAGER_PROGRAM: &str = "elan";

    /// Default timeout for a version probe
    pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;
}

/// User-facing messages
pub mod messages {
    pub const NO_ACTIVE_SESSION: &str = "No active session.";

    pub const NO_ACTIVE_DOCUMENT: &str = "No active editor tab for a managed document. \
         Focus the editor tab for which you want to issue a restart.";

    pub const OPEN_PARENT_PROJECT: &str = "Open parent directory project";
}

/// Build the main .wsc directory path from a base directory
pub fn wsc_dir_path(base: &Path) -> PathBuf {
    base.join(WSC_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    wsc_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    wsc_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

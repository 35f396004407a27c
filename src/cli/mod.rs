//! CLI-specific functionality for the workspace session coordinator
//!
//! This module contains argument parsing and configuration discovery.

pub mod args;
pub mod config;

pub use args::{Args, ExecutionMode, ProbeRequest};
pub use config::ConfigDiscovery;

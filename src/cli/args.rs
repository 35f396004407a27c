//! Command line argument parsing
//!
//! Subcommands:
//! - `probe`: Detect the toolchain version serving a project root
//! - `show-config`: Show configuration discovery information
//! - `init-config`: Write the default user configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Probe(ProbeRequest),
    ShowConfig,
    InitConfig { force: bool },
}

#[derive(Debug)]
pub struct ProbeRequest {
    pub root: PathBuf,
    pub config_override: Option<PathBuf>,
}

#[derive(Debug, Parser)]
#[command(name = "wsc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Workspace session coordinator: one toolchain worker per project root")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect the toolchain version for a project root
    Probe {
        /// Project root directory
        path: PathBuf,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
    /// Show configuration discovery information
    ShowConfig,
    /// Write the default configuration to ~/.wsc/config.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Probe { path, config }) => Ok(ExecutionMode::Probe(ProbeRequest {
                root: path.clone(),
                config_override: config.clone(),
            })),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            Some(Commands::InitConfig { force }) => {
                Ok(ExecutionMode::InitConfig { force: *force })
            }
            None => {
                Err("No command specified. Use 'wsc --help' to see available commands.".to_string())
            }
        }
    }
}

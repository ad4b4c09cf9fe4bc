//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{default_data_dir, Settings};
use crate::errors::Result;

/// Absconditus: local password vault with a loopback API for the browser extension.
#[derive(Parser)]
#[command(
    name = "absconditus",
    about = "Local password vault with a loopback API",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding salt, vault and escrow files
    /// (default: the per-user local data directory)
    #[arg(long, env = "ABSCONDITUS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the API server (auto-unlocks from the escrowed key when possible)
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show where the vault lives and which files exist
    Status,

    /// Delete the escrowed key so the next start stays locked
    Forget,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the data directory: `--data-dir` / `ABSCONDITUS_DATA_DIR`, else
/// the platform default.
pub fn data_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => default_data_dir(),
    }
}

/// Load the settings for the resolved data directory.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::load(&data_dir(cli)?)
}

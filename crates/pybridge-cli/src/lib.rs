//! pybridge - isolated Python dependency bootstrap for editor bridges
//!
//! # Overview
//!
//! Each image-generation backend ("bridge") ships a
//! `<backend>_dependencies.toml` manifest listing the Python packages it
//! needs. pybridge discovers those manifests, checks which dependencies are
//! already satisfied, and installs the rest with pip into an isolated
//! `--target` environment, streaming the package manager's output live.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.pybridge/
//! ├── bridges/        # <backend>_dependencies.toml manifests
//! ├── env/
//! │   └── site-packages/  # isolated install target
//! ├── wheels/         # downloaded artifact cache
//! └── checkouts/      # reserved for VCS checkouts
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pybridge")]
#[command(
    author,
    version,
    about = "pybridge - Python dependency bootstrap for editor bridges"
)]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding <backend>_dependencies.toml manifests
    #[arg(long, global = true, env = "PYBRIDGE_MANIFEST_DIR")]
    pub manifest_dir: Option<PathBuf>,

    /// Python interpreter used to run the package manager
    #[arg(long, global = true, env = "PYBRIDGE_PYTHON")]
    pub python: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show dependency status for a backend (or all discovered backends)
    Status {
        /// Backend name; omit to show every discovered backend
        backend: Option<String>,
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Install a backend's dependencies
    Install {
        /// Backend name, as discovered from its manifest file
        backend: String,
        /// Reinstall even when a dependency is already satisfied
        #[arg(short, long)]
        force: bool,
        /// Kill the install if it runs longer than this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List discovered backend manifests
    Bridges,
    /// Remove the isolated environment
    Reset {
        /// Also clear the legacy environment location
        #[arg(long)]
        legacy: bool,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Remove cached wheels and checkouts
    Clean,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

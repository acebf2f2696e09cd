//! CLI subcommands

pub mod bridges;
pub mod clean;
pub mod completions;
pub mod install;
pub mod reset;
pub mod status;

use std::path::PathBuf;

use pybridge_core::{DependencyManager, ManagerConfig};

/// Resolved invocation context shared by the subcommands.
#[derive(Debug, Clone)]
pub struct CmdContext {
    pub manifest_dir: PathBuf,
    pub python: Option<PathBuf>,
    pub dry_run: bool,
    pub quiet: bool,
}

impl CmdContext {
    pub fn from_cli(cli: &crate::Cli) -> Self {
        Self {
            manifest_dir: cli
                .manifest_dir
                .clone()
                .unwrap_or_else(pybridge_core::manifest_dir),
            python: cli.python.clone(),
            dry_run: cli.dry_run,
            quiet: cli.quiet,
        }
    }

    /// Build a manager with manifests loaded from the context's directory.
    pub fn manager(&self) -> DependencyManager {
        let mut config = ManagerConfig::from_default_paths();
        if let Some(python) = &self.python {
            config.python.clone_from(python);
        }
        let manager = DependencyManager::new(config);
        let found = manager.load_manifests(&self.manifest_dir);
        tracing::debug!(found, dir = %self.manifest_dir.display(), "manifest discovery");
        manager
    }
}

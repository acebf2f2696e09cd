//! Isolated environment lifecycle.
//!
//! Owns the install-target directory: creation, clearing, and the reset
//! notification that lets the host persist a "dependencies were reset" flag
//! instead of re-clearing on every startup. A legacy prior location (used by
//! plugin versions before the current layout) can be cleared alongside so an
//! upgrade never leaves stale packages shadowing the new environment.

use std::io;
use std::path::{Path, PathBuf};

type ResetHook = Box<dyn Fn() + Send + Sync>;

/// The isolated install-target directory and its lifecycle.
pub struct Environment {
    site_packages: PathBuf,
    legacy: Option<PathBuf>,
    on_reset: Option<ResetHook>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("site_packages", &self.site_packages)
            .field("legacy", &self.legacy)
            .field("has_reset_hook", &self.on_reset.is_some())
            .finish()
    }
}

impl Environment {
    pub fn new(site_packages: impl Into<PathBuf>) -> Self {
        Self {
            site_packages: site_packages.into(),
            legacy: None,
            on_reset: None,
        }
    }

    /// Register the previously-used environment location so it can be
    /// cleared on request.
    pub fn with_legacy(mut self, legacy: impl Into<PathBuf>) -> Self {
        self.legacy = Some(legacy.into());
        self
    }

    /// Install a hook invoked exactly once at the end of each clear cycle.
    pub fn set_reset_hook(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.on_reset = Some(Box::new(hook));
    }

    /// The install target handed to the package manager.
    pub fn site_packages(&self) -> &Path {
        &self.site_packages
    }

    /// The legacy environment location, when configured.
    pub fn legacy(&self) -> Option<&Path> {
        self.legacy.as_deref()
    }

    /// Create the target directory (and parents). Idempotent.
    ///
    /// # Errors
    ///
    /// Propagates filesystem errors other than "already exists".
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.site_packages)
    }

    /// Recursively delete the target directory; no error when absent. With
    /// `also_clear_legacy`, the legacy location is cleared too. The caller is
    /// responsible for calling [`ensure`](Self::ensure) again before further
    /// installs; the reset hook fires once per clear cycle regardless.
    ///
    /// # Errors
    ///
    /// Propagates filesystem errors other than "not found".
    pub fn clear(&self, also_clear_legacy: bool) -> io::Result<()> {
        remove_tree(&self.site_packages)?;
        if also_clear_legacy {
            if let Some(legacy) = &self.legacy {
                tracing::info!(legacy = %legacy.display(), "clearing legacy environment");
                remove_tree(legacy)?;
            }
        }
        if let Some(hook) = &self.on_reset {
            hook();
        }
        Ok(())
    }

    /// Total size in bytes of everything installed into the environment.
    pub fn tree_size(&self) -> u64 {
        walkdir::WalkDir::new(&self.site_packages)
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.metadata().ok())
            .filter(std::fs::Metadata::is_file)
            .map(|meta| meta.len())
            .sum()
    }
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

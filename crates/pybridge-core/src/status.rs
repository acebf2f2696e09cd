//! Side-effect-free install status probes.
//!
//! Inspects the target environment's own package metadata and module layout
//! on disk, never the running process's import path, and nothing is
//! executed, so a broken package cannot crash a status check. Probes are
//! recomputed on every call because the target directory can change
//! underneath the process.
//!
//! Status queries never fail: any metadata that cannot be read degrades to
//! "version unknown" so aggregate checks stay robust against one bad probe.

use std::path::{Path, PathBuf};

use pybridge_schema::{DependencyState, DependencyStatus, PackageName, PackageSpec};

/// Probes one target environment directory.
#[derive(Debug, Clone)]
pub struct StatusInspector {
    site_packages: PathBuf,
}

impl StatusInspector {
    pub fn new(site_packages: impl Into<PathBuf>) -> Self {
        Self {
            site_packages: site_packages.into(),
        }
    }

    /// The directory this inspector probes.
    pub fn site_packages(&self) -> &Path {
        &self.site_packages
    }

    /// Probe one spec. Installedness follows the module probe, matching the
    /// import-based check the host ultimately cares about; the metadata
    /// version is carried alongside when found.
    pub fn status(&self, spec: &PackageSpec) -> DependencyStatus {
        let version = self.installed_version(&spec.name);
        let module_found = self.module_resolves(spec.module_name());
        let state = if module_found {
            DependencyState::Installed
        } else {
            DependencyState::NotInstalled
        };
        DependencyStatus {
            name: spec.name.clone(),
            state,
            version,
            module_found,
        }
    }

    /// Look up the installed distribution version from `*.dist-info`
    /// metadata directories. Returns `None` when the distribution cannot be
    /// found or its metadata is unreadable.
    pub fn installed_version(&self, name: &PackageName) -> Option<String> {
        let wanted = canonical_name(name.as_str());
        let entries = std::fs::read_dir(&self.site_packages).ok()?;
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = file_name.strip_suffix(".dist-info") else {
                continue;
            };
            if let Some((dist, version)) = stem.split_once('-') {
                if canonical_name(dist) == wanted {
                    return Some(version.to_string());
                }
                continue;
            }
            // Dist-info directory whose name does not follow the
            // `<dist>-<version>` convention: fall back to the METADATA file.
            if let Some((dist, version)) = read_metadata(&entry.path()) {
                if canonical_name(&dist) == wanted {
                    return Some(version);
                }
            }
        }
        None
    }

    /// Finder-style probe: does the module resolve in the target environment?
    ///
    /// Checks, in order: a package directory (regular or namespace), a plain
    /// `<module>.py` file, and compiled extension modules (`<module>.*.so` /
    /// `<module>.pyd`). Dotted names are resolved as nested paths.
    pub fn module_resolves(&self, module: &str) -> bool {
        let rel: PathBuf = module.split('.').collect();
        let base = self.site_packages.join(rel);

        if base.is_dir() {
            return true;
        }
        if base.with_extension("py").is_file() {
            return true;
        }
        extension_module_exists(&base)
    }
}

/// PEP 503 canonical form: lowercase, runs of `-`, `_`, `.` collapsed to `-`.
fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !prev_sep {
                out.push('-');
            }
            prev_sep = true;
        } else {
            out.push(c.to_ascii_lowercase());
            prev_sep = false;
        }
    }
    out
}

/// Read `Name:` and `Version:` from a dist-info `METADATA` file.
fn read_metadata(dist_info: &Path) -> Option<(String, String)> {
    let text = std::fs::read_to_string(dist_info.join("METADATA")).ok()?;
    let mut name = None;
    let mut version = None;
    // Headers end at the first blank line; the body may contain anything.
    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Name:") {
            name = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Version:") {
            version = Some(value.trim().to_string());
        }
        if name.is_some() && version.is_some() {
            break;
        }
    }
    Some((name?, version?))
}

/// Does a compiled extension module exist for `base` (e.g.
/// `_soundfile.cpython-39-x86_64-linux-gnu.so` or `_soundfile.pyd`)?
fn extension_module_exists(base: &Path) -> bool {
    let (Some(parent), Some(stem)) = (base.parent(), base.file_name().and_then(|s| s.to_str()))
    else {
        return false;
    };
    let Ok(entries) = std::fs::read_dir(parent) else {
        return false;
    };
    let prefix = format!("{stem}.");
    entries.flatten().any(|entry| {
        entry.file_name().to_str().is_some_and(|file_name| {
            file_name.strip_prefix(&prefix).is_some_and(|rest| {
                rest.ends_with("so") || rest.ends_with("pyd")
            })
        })
    })
}

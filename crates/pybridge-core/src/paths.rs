use dirs::home_dir;
use std::path::PathBuf;

/// Returns the primary pybridge directory, or None if the user's home cannot
/// be resolved.
pub fn try_bridge_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("PYBRIDGE_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".pybridge"))
}

/// Returns the canonical pybridge home directory (`~/.pybridge`).
///
/// # Panics
///
/// Panics if neither `PYBRIDGE_HOME` is set nor the user's home directory can
/// be resolved.
pub fn bridge_home() -> PathBuf {
    try_bridge_home().expect("Could not determine home directory. Set PYBRIDGE_HOME to override.")
}

/// Backend manifest directory: ~/.pybridge/bridges
pub fn manifest_dir() -> PathBuf {
    bridge_home().join("bridges")
}

/// Root of the isolated environment: ~/.pybridge/env
pub fn env_root() -> PathBuf {
    bridge_home().join("env")
}

/// Install target handed to the package manager's `--target`:
/// ~/.pybridge/env/site-packages
pub fn site_packages_path() -> PathBuf {
    env_root().join("site-packages")
}

/// Environment location used by plugin versions before the env/ split.
/// Cleared on request so stale packages cannot shadow the current environment.
pub fn legacy_site_packages_path() -> PathBuf {
    bridge_home().join("site-packages")
}

/// Downloaded wheel cache, one file per derived artifact name:
/// ~/.pybridge/wheels
pub fn wheel_cache_path() -> PathBuf {
    bridge_home().join("wheels")
}

/// VCS checkout area, one subdirectory per dependency: ~/.pybridge/checkouts
pub fn checkout_path() -> PathBuf {
    bridge_home().join("checkouts")
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_url_takes_last_segment() {
        assert_eq!(
            filename_from_url("https://example.com/a/b/beta-2.0-py3-none-any.whl"),
            "beta-2.0-py3-none-any.whl"
        );
        assert_eq!(filename_from_url(""), "");
    }
}

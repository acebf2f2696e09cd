//! Clean command (cache garbage collection)

use crate::ui::Output;
use anyhow::Result;

/// Remove cached wheels and VCS checkouts.
pub fn clean(dry_run: bool) -> Result<()> {
    let output = Output::new();

    for dir in [
        pybridge_core::wheel_cache_path(),
        pybridge_core::checkout_path(),
    ] {
        if dir.exists() {
            output.info(&format!("Removing {}", dir.display()));
            if !dry_run {
                let _ = std::fs::remove_dir_all(&dir);
            }
        }
    }

    output.success("Cache is clean.");
    Ok(())
}

//! Install command: sequential manifest install with live streamed output.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::cmd::CmdContext;
use crate::ui::ConsoleReporter;

/// Install a backend's dependencies.
///
/// With the global `--dry-run` flag the manifest is resolved but nothing is
/// installed; the concrete package-manager references are printed instead.
pub async fn install(
    ctx: &CmdContext,
    backend: &str,
    force: bool,
    timeout: Option<u64>,
) -> Result<()> {
    let manager = ctx.manager();
    let reporter = ConsoleReporter::new(ctx.quiet);

    if ctx.dry_run {
        let manifest = manager
            .registry()
            .get(backend)
            .with_context(|| format!("Unknown backend '{backend}'"))?;
        for spec in manifest.specs() {
            let reference = manager.resolve(spec, &reporter).await?;
            println!("{} -> {reference}", spec.name);
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();

    // Ctrl-C kills the in-flight package-manager child instead of leaving it
    // orphaned mid-write.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // A wall-clock timeout is treated exactly like cancellation.
    if let Some(secs) = timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            cancel.cancel();
        });
    }

    let results = manager
        .install_manifest(backend, force, &reporter, &cancel)
        .await?;

    let failed = results.iter().filter(|r| !r.is_installed()).count();
    if failed > 0 {
        anyhow::bail!("{failed} dependency install(s) failed; see output above");
    }
    Ok(())
}

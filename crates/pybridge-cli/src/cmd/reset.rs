//! Reset command: clear the isolated environment.

use std::io::Write;

use anyhow::Result;

use crate::cmd::CmdContext;
use crate::ui::Output;

/// Remove everything installed into the environment. With `--legacy`, the
/// previously-used environment location is cleared as well.
pub fn reset(ctx: &CmdContext, legacy: bool, yes: bool) -> Result<()> {
    let output = Output::new();
    let mut manager = ctx.manager();
    let site = manager.config().site_packages.clone();

    if !yes {
        print!(
            "This removes all installed backend dependencies from {}. Continue? [y/N] ",
            site.display()
        );
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            output.info("Aborted.");
            return Ok(());
        }
    }

    if ctx.dry_run {
        output.info(&format!("(dry run) would remove {}", site.display()));
        return Ok(());
    }

    manager.set_reset_hook(|| {
        println!("Dependencies were reset. Run 'pybridge install <backend>' before next use.");
    });
    manager.clear_all_dependencies(legacy)?;
    Ok(())
}

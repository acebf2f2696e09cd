//! List discovered backend manifests.

use anyhow::Result;
use comfy_table::Table;

use crate::cmd::CmdContext;

pub fn bridges(ctx: &CmdContext) -> Result<()> {
    let manager = ctx.manager();
    let manifests = manager.registry().snapshot();

    if manifests.is_empty() {
        println!(
            "No backend manifests found in {}",
            ctx.manifest_dir.display()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Backend", "Dependencies"]);
    for (backend, manifest) in &manifests {
        table.add_row(vec![backend.clone(), manifest.len().to_string()]);
    }
    println!("{table}");
    Ok(())
}

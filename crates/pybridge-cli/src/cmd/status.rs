//! Status command: per-dependency probe results and the aggregate view.

use std::collections::BTreeMap;

use anyhow::Result;
use comfy_table::Table;

use crate::cmd::CmdContext;
use crate::ui::format_size;
use pybridge_schema::DependencyStatus;

/// Show dependency status for one backend, or all discovered backends.
pub fn status(ctx: &CmdContext, backend: Option<&str>, json: bool) -> Result<()> {
    let manager = ctx.manager();

    let backends = match backend {
        Some(name) => vec![name.to_string()],
        None => manager.registry().backend_names(),
    };
    if backends.is_empty() {
        println!(
            "No backend manifests found in {}",
            ctx.manifest_dir.display()
        );
        return Ok(());
    }

    let mut report: BTreeMap<String, Vec<DependencyStatus>> = BTreeMap::new();
    for name in &backends {
        report.insert(name.clone(), manager.manifest_status(name)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Backend", "Package", "State", "Version", "Module"]);
    for (backend, statuses) in &report {
        for status in statuses {
            table.add_row(vec![
                backend.clone(),
                status.name.to_string(),
                status.state.to_string(),
                status.version.clone().unwrap_or_else(|| "-".to_string()),
                (if status.module_found { "found" } else { "-" }).to_string(),
            ]);
        }
    }
    println!("{table}");

    // Aggregate per backend: the full missing list, not just the first gap.
    println!();
    for (backend, statuses) in &report {
        let missing: Vec<&str> = statuses
            .iter()
            .filter(|s| !s.is_installed())
            .map(|s| s.name.as_str())
            .collect();
        if missing.is_empty() {
            println!("{backend}: all dependencies installed");
        } else {
            println!("{backend}: missing {}", missing.join(", "));
        }
    }

    let environment = manager.environment();
    println!();
    println!(
        "Environment: {} ({})",
        environment.site_packages().display(),
        format_size(environment.tree_size())
    );

    Ok(())
}

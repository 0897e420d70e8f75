use anyhow::{Result, bail};
use colored::Colorize;
use novakit::{AggregateReconciler, DesiredAggregate};

use crate::Context;
use crate::commands;
use crate::ui;

/// Show one aggregate as reported by the CLI
pub fn run(ctx: &Context, name: &str, json: bool) -> Result<()> {
    let executor = commands::executor(ctx)?;
    let reconciler = AggregateReconciler::new(&executor, DesiredAggregate::new(name));
    let observed = reconciler.lookup()?;

    if !observed.present {
        bail!("Aggregate '{name}' not found");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&observed)?);
        return Ok(());
    }

    ui::header(&format!("Aggregate {}", observed.name));
    ui::kv("Id", &observed.id);
    ui::kv("Zone", &observed.availability_zone);
    ui::kv("Hosts", &ui::format_hosts(&observed.hosts));
    ui::kv("Metadata", &ui::format_metadata(&observed.metadata));
    println!();
    Ok(())
}

/// Detach every host and delete the aggregate
pub fn destroy(ctx: &Context, name: &str, dry_run: bool) -> Result<()> {
    let executor = commands::executor(ctx)?;
    let mut reconciler =
        AggregateReconciler::new(&executor, DesiredAggregate::new(name).absent());

    if !reconciler.exists()? {
        ui::info(&format!("Aggregate '{name}' does not exist, nothing to do"));
        return Ok(());
    }

    if dry_run {
        if let Some(observed) = reconciler.observed() {
            ui::header("Dry run");
            for host in &observed.hosts {
                ui::dim(&format!("would remove host {host}"));
            }
            ui::dim(&format!("would delete aggregate {} ({})", name, observed.id));
        }
        return Ok(());
    }

    reconciler.destroy()?;
    ui::success(&format!("Removed aggregate {}", name.bold()));
    Ok(())
}

use anyhow::Result;
use colored::Colorize;
use novakit::{AggregateReconciler, DesiredAggregate, Ensure};

use crate::Context;
use crate::cli::ManifestArgs;
use crate::commands;
use crate::ui;

pub fn run(ctx: &Context, args: &ManifestArgs) -> Result<()> {
    let (path, manifest) = commands::load_manifest(args)?;
    let selected = manifest.select(args.name.as_deref())?;

    ui::header("Aggregate Status");
    ui::kv("Manifest", &path.display().to_string());
    ui::kv("Nova config", &ctx.nova_conf.display().to_string());

    if selected.is_empty() {
        ui::warn("No aggregates declared");
        return Ok(());
    }

    let executor = commands::executor(ctx)?;
    let mut drifted = 0;
    let mut failed = 0;

    for desired in selected {
        let mut reconciler = AggregateReconciler::new(&executor, desired.clone());
        match reconciler.exists() {
            Ok(present) => {
                if !show_aggregate(ctx, &reconciler, desired, present) {
                    drifted += 1;
                }
            }
            Err(e) => {
                commands::report(&desired.name, &e);
                failed += 1;
            }
        }
    }

    println!();
    if failed > 0 {
        anyhow::bail!("{failed} aggregate(s) could not be queried");
    }
    if drifted == 0 {
        ui::success("All aggregates in sync");
    } else {
        ui::warn(&format!("{drifted} aggregate(s) out of sync, run: novagg apply"));
    }
    Ok(())
}

/// Print one aggregate; returns whether it matches the manifest
fn show_aggregate(
    ctx: &Context,
    reconciler: &AggregateReconciler<'_>,
    desired: &DesiredAggregate,
    present: bool,
) -> bool {
    ui::section(&desired.name);

    let wanted = desired.ensure == Ensure::Present;
    let in_sync = match (reconciler.observed(), present) {
        (Some(observed), true) => wanted && !reconciler.needs_update(observed),
        _ => !wanted,
    };

    ui::kv(
        "Ensure",
        if wanted { "present" } else { "absent" },
    );
    ui::kv(
        "State",
        &if present {
            "present".green().to_string()
        } else {
            "absent".yellow().to_string()
        },
    );

    if let (Some(observed), true) = (reconciler.observed(), present) {
        if ctx.verbose > 0 {
            ui::kv("Id", &observed.id);
        }
        ui::kv("Zone", &observed.availability_zone);
        ui::kv("Hosts", &ui::format_hosts(&observed.hosts));
        ui::kv("Metadata", &ui::format_metadata(&observed.metadata));
        if wanted && !in_sync {
            ui::kv("Pending", &ui::format_plan(&reconciler.plan(observed)));
        }
    }

    ui::kv(
        "Status",
        &if in_sync {
            "in sync".green().to_string()
        } else {
            "drift".yellow().to_string()
        },
    );
    in_sync
}

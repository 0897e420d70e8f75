use anyhow::Result;
use colored::Colorize;
use novakit::{AggregateReconciler, Outcome};

use crate::Context;
use crate::cli::ManifestArgs;
use crate::commands;
use crate::ui;

/// Preview what apply would change
pub fn diff(ctx: &Context, args: &ManifestArgs) -> Result<()> {
    run(ctx, args, true)
}

/// Converge every selected aggregate
///
/// A failed aggregate does not stop the others; the run fails at the end.
pub fn run(ctx: &Context, args: &ManifestArgs, dry_run: bool) -> Result<()> {
    let (_, manifest) = commands::load_manifest(args)?;
    let selected = manifest.select(args.name.as_deref())?;

    if selected.is_empty() {
        ui::warn("No aggregates declared");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(if dry_run { "Aggregate Diff" } else { "Applying Aggregates" });
    }

    let executor = commands::executor(ctx)?;
    let mut changed = 0;
    let mut failed = Vec::new();

    for desired in selected {
        let mut reconciler = AggregateReconciler::new(&executor, desired.clone());
        match reconciler.converge(dry_run) {
            Ok(outcome) => {
                if outcome.is_change() {
                    changed += 1;
                }
                print_outcome(ctx, &desired.name, &outcome, dry_run);
            }
            Err(e) => {
                commands::report(&desired.name, &e);
                failed.push(desired.name.clone());
            }
        }
    }

    if !ctx.quiet {
        println!();
        let verb = if dry_run { "to change" } else { "changed" };
        ui::info(&format!("{changed} {verb}, {} failed", failed.len()));
    }

    if !failed.is_empty() {
        anyhow::bail!("Failed to reconcile: {}", failed.join(", "));
    }
    Ok(())
}

fn print_outcome(ctx: &Context, name: &str, outcome: &Outcome, dry_run: bool) {
    let label = ui::outcome_label(outcome, dry_run);
    match outcome {
        Outcome::Unchanged => {
            if !ctx.quiet {
                ui::dim(&format!("{name}: {label}"));
            }
        }
        Outcome::Updated(plan) => {
            ui::success(&format!(
                "{}: {} ({})",
                name.bold(),
                label,
                ui::format_plan(plan)
            ));
        }
        Outcome::Created | Outcome::Removed => {
            ui::success(&format!("{}: {}", name.bold(), label));
        }
    }
}

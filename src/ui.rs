use colored::Colorize;
use novakit::{AggregatePlan, Outcome};
use std::collections::BTreeMap;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Aggregate Formatting
// ============================================================================

/// Comma-separated host list, `-` when empty
pub fn format_hosts(hosts: &[String]) -> String {
    if hosts.is_empty() {
        "-".to_string()
    } else {
        hosts.join(", ")
    }
}

/// `key=value` pairs, `-` when empty
pub fn format_metadata(metadata: &BTreeMap<String, String>) -> String {
    if metadata.is_empty() {
        return "-".to_string();
    }
    metadata
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Host changes as `+added -removed`
pub fn format_plan(plan: &AggregatePlan) -> String {
    let added = plan.hosts_to_add.iter().map(|h| format!("+{h}"));
    let removed = plan.hosts_to_remove.iter().map(|h| format!("-{h}"));
    let changes: Vec<String> = added.chain(removed).collect();
    if changes.is_empty() {
        "properties only".to_string()
    } else {
        changes.join(" ")
    }
}

/// Short verb for an outcome
pub fn outcome_label(outcome: &Outcome, dry_run: bool) -> &'static str {
    match (outcome, dry_run) {
        (Outcome::Unchanged, _) => "unchanged",
        (Outcome::Created, false) => "created",
        (Outcome::Created, true) => "would create",
        (Outcome::Updated(_), false) => "updated",
        (Outcome::Updated(_), true) => "would update",
        (Outcome::Removed, false) => "removed",
        (Outcome::Removed, true) => "would remove",
    }
}

// ============================================================================
// Tests
// ============================================================================

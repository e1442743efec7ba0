//! Human-readable reports for upgrade and switch runs.

use colored::Colorize;

use crate::gke::planner::{PlannedVersion, VersionOrigin};
use crate::gke::switch::{FlagSwitch, SwitchReport};
use crate::gke::upgrade::{FieldChange, FieldStatus, PoolOutcome, UpgradeReport};

/// Print a section header.
fn print_section(title: &str) {
    println!();
    println!("{}", format!("=== {} ===", title).magenta().bold());
}

/// Print how the target version was determined.
pub fn print_planned_version(planned: &PlannedVersion) {
    match &planned.origin {
        VersionOrigin::Explicit => {
            println!(
                "{} Using specified GKE version: {}",
                "→".cyan(),
                planned.version.cyan().bold()
            );
        }
        VersionOrigin::Feed {
            family,
            batch,
            inferred_from,
        } => {
            if let Some(highest) = inferred_from {
                println!(
                    "{} Highest GKE version in file is: {}",
                    "→".cyan(),
                    highest.to_string().cyan().bold()
                );
            }
            println!(
                "{} {} GKE version for minor version {} is: {}",
                "→".cyan(),
                batch,
                family,
                planned.version.cyan().bold()
            );
        }
    }
}

fn describe_field(change: &FieldChange, target: &str, indent: &str, what: &str) {
    match &change.status {
        FieldStatus::Upgraded { from } => println!(
            "{}{} Upgraded {} {} -> {}",
            indent,
            "✓".green(),
            what,
            from.dimmed(),
            target.green()
        ),
        FieldStatus::AlreadyCurrent => println!(
            "{}{} {} already at {}",
            indent,
            "-".yellow(),
            capitalize(what),
            target.yellow()
        ),
        FieldStatus::Missing => println!(
            "{}{} {} not found in env file",
            indent,
            "⚠".red(),
            change.key.red()
        ),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Print the per-field report of an upgrade pass.
pub fn print_upgrade_report(report: &UpgradeReport) {
    print_section("GKE Control Plane");
    describe_field(&report.control_plane, &report.target_version, "", "control plane");

    print_section("Nodepools");
    if report.pools.is_empty() {
        println!("  {}", "No *_NODE_POOL_ACTIVE fields found".dimmed());
    }

    for pool in &report.pools {
        println!("{}:", pool.label.bold());
        match &pool.outcome {
            PoolOutcome::Evaluated {
                active,
                active_key,
                active_version,
                non_active,
                non_active_version,
                change,
            } => {
                let active_version = active_version.as_deref().unwrap_or("-");
                println!(
                    "  • Active: {} (version: {})",
                    active,
                    active_version.cyan()
                );
                println!(
                    "  • Non-active: {} (version: {})",
                    non_active,
                    non_active_version.as_deref().unwrap_or("-").cyan()
                );
                let what = format!("non-active pool '{}'", non_active);
                describe_field(change, &report.target_version, "  ", &what);
                println!(
                    "  {}",
                    format!("{} (active) is at {}", active_key, active_version).dimmed()
                );
            }
            PoolOutcome::InvalidFlag { key, value } => {
                println!(
                    "  {} {} is '{}', expected 'a' or 'b'. Skipped.",
                    "⚠".red(),
                    key.red(),
                    value
                );
            }
        }
    }
}

/// Print the closing line of an upgrade run.
pub fn print_upgrade_summary(report: &UpgradeReport, dry_run: bool) {
    println!();
    if !report.changed() {
        println!(
            "{}",
            "Everything is already up-to-date. Nothing to do."
                .green()
                .bold()
        );
    } else if dry_run {
        println!(
            "{}",
            "[DRY RUN] Control plane and non-active nodepools would be upgraded. File not written."
                .yellow()
        );
    } else {
        println!(
            "{}",
            "Control plane and non-active nodepools upgraded."
                .green()
                .bold()
        );
    }
}

/// Print the result of switching active nodepools.
pub fn print_switch_report(report: &SwitchReport, dry_run: bool) {
    print_section("Switching Active Nodepools");

    for flag in &report.flags {
        match &flag.result {
            FlagSwitch::Switched { from, to } => {
                println!("{} {}: {} -> {}", "↻".cyan(), flag.key, from, to.to_string().cyan());
            }
            FlagSwitch::Unchanged { value } => {
                println!(
                    "{} {}: '{}' is not 'a' or 'b', left unchanged",
                    "⚠".yellow(),
                    flag.key,
                    value
                );
            }
        }
    }

    println!();
    if dry_run {
        println!(
            "{}",
            format!(
                "[DRY RUN] {} active nodepool flag(s) would be switched. File not written.",
                report.switched_count()
            )
            .yellow()
        );
    } else {
        println!(
            "{}",
            "Switched active nodepools only. Exiting.".green().bold()
        );
    }
}

use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};

use crate::codelocation::NamedCodeLocation;
use crate::extraction::ExtractionDetail;
use crate::models::{NameVersion, StatusType};
use crate::search::StrategyEvaluation;
use crate::status::DetectorStatus;

/// Render the colored terminal report.
pub fn render(
    project: &NameVersion,
    source_path: &Path,
    evaluations: &[StrategyEvaluation],
    details: &[ExtractionDetail],
    locations: &[NamedCodeLocation],
    status: &DetectorStatus,
    verbose: bool,
    quiet: bool,
) {
    if quiet {
        let failures = status.iter().filter(|&(_, s)| s == StatusType::Failure).count();
        println!(
            "Project: {}  Code locations: {}  Failed detectors: {}",
            project,
            locations.len(),
            if failures > 0 {
                failures.to_string().red().to_string()
            } else {
                failures.to_string().green().to_string()
            }
        );
        return;
    }

    println!("\n {} v{}", "depscan".bold(), env!("CARGO_PKG_VERSION"));
    println!(" Scanning: {}\n", source_path.display());

    render_search_summary(evaluations, verbose);

    if verbose {
        render_failures(details, true);
    }

    if !locations.is_empty() {
        println!(" Code locations:\n");
        render_location_table(locations);
        println!();
    }

    println!(" Detector status:");
    for (detector, detector_status) in status.iter() {
        if detector_status == StatusType::NotRun && !verbose {
            continue;
        }
        let label = match detector_status {
            StatusType::Success => "✓ success".green().to_string(),
            StatusType::Failure => "✗ failure".red().to_string(),
            StatusType::NotRun => "- not run".dimmed().to_string(),
        };
        println!("   {:<10} {}", detector.to_string(), label);
    }
    println!();

    if !verbose {
        render_failures(details, false);
    }

    println!(
        " Project: {} {}",
        project.name.bold(),
        project.version.as_str().cyan()
    );
}

fn render_search_summary(evaluations: &[StrategyEvaluation], verbose: bool) {
    let mut current_dir: Option<&Path> = None;
    for evaluation in evaluations {
        if !evaluation.is_applicable() && !verbose {
            continue;
        }
        let dir = evaluation.environment.directory.as_path();
        if current_dir != Some(dir) {
            current_dir = Some(dir);
            let marker = if evaluation.environment.excluded {
                " (excluded)".yellow().to_string()
            } else {
                String::new()
            };
            println!(" {}{}", dir.display(), marker);
        }
        if evaluation.is_applicable() {
            println!(
                "   {} {} ({})",
                "APPLIES".green(),
                evaluation.detector_name,
                evaluation.matched_files.join(", ")
            );
        } else {
            println!(
                "   {} {}: {}",
                "skip".dimmed(),
                evaluation.detector_name.dimmed(),
                evaluation.applicable.description().dimmed()
            );
        }
    }
    if current_dir.is_some() {
        println!();
    }
}

fn render_failures(details: &[ExtractionDetail], verbose: bool) {
    let failures: Vec<_> = details
        .iter()
        .filter_map(|d| d.failure_description().map(|reason| (d, reason)))
        .collect();
    if failures.is_empty() {
        return;
    }
    println!(" {} Detectors that could not extract:\n", "[FAIL]".red().bold());
    for (detail, reason) in failures {
        println!(
            "   {} at {}: {}",
            detail.detector_name,
            detail.directory.display(),
            reason
        );
        if verbose {
            println!("     depth {}", detail.depth);
        }
    }
    println!();
}

fn render_location_table(locations: &[NamedCodeLocation]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Source path").add_attribute(Attribute::Bold),
            Cell::new("Detectors").add_attribute(Attribute::Bold),
            Cell::new("Components").add_attribute(Attribute::Bold),
        ]);

    for location in locations {
        let detectors = location
            .detector_types
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(&location.name),
            Cell::new(location.source_path.display().to_string()),
            Cell::new(detectors),
            Cell::new(location.graph.node_count().to_string()),
        ]);
    }

    println!("{}", table);
}

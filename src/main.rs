//! `depscan` — inventory a source tree for package-manager dependencies.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load configuration ([`config::load_config`]).
//! 3. Search the tree, recording every detector's applicability per
//!    directory ([`search`]).
//! 4. Run the extractability and extraction phases for applicable
//!    detectors ([`extraction`]).
//! 5. Group and name code locations ([`codelocation`]).
//! 6. Decide the project name/version ([`project`]).
//! 7. Render the requested report ([`report`]), optionally writing one
//!    graph artifact per code location.
//! 8. Exit `0` (clean) or `1` (a detector category failed, per policy).

mod cli;
mod codelocation;
mod config;
mod detector;
mod executable;
mod extraction;
mod graph;
mod inspector;
mod models;
mod project;
mod report;
mod search;
mod status;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{Cli, ReportFormat};
use config::load_config;
use detector::{registry, DetectorContext};
use executable::ExecutableFinder;
use models::DetectorType;
use project::ProjectDecisionOptions;
use search::SearchOptions;
use status::DetectorStatus;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve source path
    let path = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    let config = load_config(&path, cli.config.as_deref())?;

    // CLI flags win over config values
    let max_depth = cli.max_depth.unwrap_or(config.search.max_depth);
    let timeout = Duration::from_secs(cli.timeout.unwrap_or(config.extraction.timeout_seconds));

    let context = Arc::new(DetectorContext::new(ExecutableFinder::from_env(), timeout));
    let excluded: Vec<DetectorType> = cli
        .exclude_detectors
        .iter()
        .map(|&arg| DetectorType::from(arg))
        .collect();
    let detectors: Vec<_> = registry(context)
        .into_iter()
        .filter(|d| !excluded.contains(&d.detector_type()))
        .collect();

    let search_options = SearchOptions {
        max_depth,
        excluded_directories: config.search.excluded_directories.clone(),
        forced_detector: cli.detector.map(DetectorType::from),
    };
    let found = search::search(&path, &detectors, &search_options)?;

    let applicable_count = found.applicable().count() as u64;
    let progress = if !cli.quiet && applicable_count > 0 {
        let pb = ProgressBar::new(applicable_count);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb.set_message("extracting");
        Some(pb)
    } else {
        None
    };

    let extracted = extraction::perform_extractions(&detectors, &found.evaluations, progress.as_ref());

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let processed = codelocation::process(
        extracted.code_locations,
        extracted.failed.clone(),
        cli.aggregate.as_deref(),
        &path,
    );

    let decided = project::decide(
        &path,
        &extracted.candidates,
        &ProjectDecisionOptions {
            override_name: cli.project_name.clone(),
            override_version: cli.project_version.clone(),
            preferred_detector: cli.preferred_detector.map(DetectorType::from),
            default_version: config.project.default_version(),
        },
    );

    let detector_status = DetectorStatus::from_outcomes(&processed.successful, &processed.failed);

    if let Some(output_dir) = &cli.output {
        report::write_artifacts(output_dir, &processed.locations)?;
    }

    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(
                &decided,
                &path,
                &found.evaluations,
                &extracted.details,
                &processed.locations,
                &detector_status,
                cli.verbose,
                cli.quiet,
            );
        }
        ReportFormat::Json => {
            let scan_report = report::build_report(
                decided,
                &path,
                &processed.locations,
                &detector_status,
                &extracted.details,
            );
            println!("{}", serde_json::to_string_pretty(&scan_report)?);
        }
    }

    if !detector_status.overall_success(config.status.fail_on_detector_failure) {
        std::process::exit(1);
    }

    Ok(())
}

//! Report builders and renderers for scan results.
//!
//! - [`terminal`] — colored, tabular output; respects `--verbose` / `--quiet`.
//! - [`ScanReport`] — serializable form of a whole run, used by `--report json`.
//! - [`write_artifacts`] — one JSON graph file per named code location.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::codelocation::NamedCodeLocation;
use crate::extraction::ExtractionDetail;
use crate::graph::GraphArtifact;
use crate::models::{DetectorType, NameVersion, StatusType};
use crate::status::DetectorStatus;

pub mod terminal;

/// Serializable summary of a whole scan.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub project: NameVersion,
    pub source_path: PathBuf,
    pub statuses: Vec<StatusEntry>,
    pub code_locations: Vec<CodeLocationEntry>,
    pub failures: Vec<FailureEntry>,
}

#[derive(Debug, Serialize)]
pub struct StatusEntry {
    pub detector: DetectorType,
    pub status: StatusType,
}

#[derive(Debug, Serialize)]
pub struct CodeLocationEntry {
    pub name: String,
    pub source_path: PathBuf,
    pub detectors: BTreeSet<DetectorType>,
    pub graph: GraphArtifact,
}

#[derive(Debug, Serialize)]
pub struct FailureEntry {
    pub detector: DetectorType,
    pub directory: PathBuf,
    pub reason: String,
}

pub fn build_report(
    project: NameVersion,
    source_path: &Path,
    locations: &[NamedCodeLocation],
    status: &DetectorStatus,
    details: &[ExtractionDetail],
) -> ScanReport {
    let statuses = status
        .iter()
        .filter(|&(_, s)| s != StatusType::NotRun)
        .map(|(detector, status)| StatusEntry { detector, status })
        .collect();

    let code_locations = locations
        .iter()
        .map(|location| CodeLocationEntry {
            name: location.name.clone(),
            source_path: location.source_path.clone(),
            detectors: location.detector_types.clone(),
            graph: location.graph.to_artifact(),
        })
        .collect();

    let failures = details
        .iter()
        .filter_map(|detail| {
            detail.failure_description().map(|reason| FailureEntry {
                detector: detail.detector_type,
                directory: detail.directory.clone(),
                reason,
            })
        })
        .collect();

    ScanReport {
        project,
        source_path: source_path.to_path_buf(),
        statuses,
        code_locations,
        failures,
    }
}

/// Write one pretty-printed JSON graph artifact per code location into
/// `output_dir`, creating the directory if needed. File names derive from
/// the location name with path-hostile characters replaced.
pub fn write_artifacts(output_dir: &Path, locations: &[NamedCodeLocation]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("cannot create output directory: {}", output_dir.display()))?;

    let mut written = Vec::new();
    for location in locations {
        let file_name = format!("{}.json", sanitize(&location.name));
        let path = output_dir.join(file_name);
        let json = serde_json::to_string_pretty(&location.graph.to_artifact())?;
        std::fs::write(&path, json)
            .with_context(|| format!("cannot write artifact: {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::graph::{Dependency, DependencyGraph, ExternalId, Forge};

    use super::*;

    fn named_location(name: &str) -> NamedCodeLocation {
        let mut graph = DependencyGraph::new();
        graph.add_root(Dependency::new(ExternalId::name_version(
            Forge::Npmjs,
            "express",
            "4.18.2",
        )));
        NamedCodeLocation {
            name: name.to_string(),
            source_path: PathBuf::from("/scan/app"),
            detector_types: BTreeSet::from([DetectorType::Npm]),
            graph,
        }
    }

    #[test]
    fn test_artifact_files_use_sanitized_names() {
        let dir = tempfile::tempdir().unwrap();
        let locations = vec![named_location("app/npm"), named_location("app/npm 2")];

        let written = write_artifacts(dir.path(), &locations).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            written[0].file_name().unwrap().to_str().unwrap(),
            "app_npm.json"
        );
        assert_eq!(
            written[1].file_name().unwrap().to_str().unwrap(),
            "app_npm_2.json"
        );

        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert!(content.contains("npmjs:express@4.18.2"));
    }

    #[test]
    fn test_report_skips_not_run_categories() {
        let successful = BTreeSet::from([DetectorType::Npm]);
        let failed = BTreeSet::from([DetectorType::GoMod]);
        let status = DetectorStatus::from_outcomes(&successful, &failed);

        let report = build_report(
            NameVersion::new("app", "1.0.0"),
            Path::new("/scan/app"),
            &[named_location("app/npm")],
            &status,
            &[],
        );

        assert_eq!(report.statuses.len(), 2);
        assert_eq!(report.code_locations.len(), 1);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"go-mod\""));
        assert!(!json.contains("not-run"));
    }
}

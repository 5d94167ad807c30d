use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::codelocation::DetectCodeLocation;
use crate::detector::{Detector, DetectorResult, Extraction, ExtractionId};
use crate::models::DetectorType;
use crate::project::ProjectNameVersionCandidate;
use crate::search::StrategyEvaluation;

/// Full record of one qualifying detector's extractability and extraction
/// phases at one directory.
#[derive(Debug)]
pub struct ExtractionDetail {
    pub detector_type: DetectorType,
    pub detector_name: &'static str,
    pub directory: PathBuf,
    pub depth: usize,
    pub extractable: DetectorResult,
    /// Present only when the extractability phase passed.
    pub extraction: Option<Extraction>,
}

impl ExtractionDetail {
    pub fn succeeded(&self) -> bool {
        matches!(&self.extraction, Some(extraction) if extraction.succeeded())
    }

    /// Human-readable reason when this detector did not produce a graph.
    pub fn failure_description(&self) -> Option<String> {
        if !self.extractable.passed() {
            return Some(self.extractable.description());
        }
        match &self.extraction {
            Some(Extraction::Failure { error }) => Some(error.clone()),
            _ => None,
        }
    }
}

/// Accumulated output of the extraction stage, threaded forward as a value.
#[derive(Debug, Default)]
pub struct ExtractionResult {
    pub code_locations: Vec<DetectCodeLocation>,
    pub candidates: Vec<ProjectNameVersionCandidate>,
    pub successful: BTreeSet<DetectorType>,
    pub failed: BTreeSet<DetectorType>,
    pub details: Vec<ExtractionDetail>,
}

/// Run `extractable` then `extract` for every evaluation whose
/// applicability passed.
///
/// Work fans out per directory (detectors only read their environment);
/// within a directory detectors run in registration order. Failures are
/// collected, never propagated — one detector's broken toolchain must not
/// abort the rest of the run. Results are re-sorted by (directory,
/// registration order) so output never depends on completion order.
pub fn perform_extractions(
    detectors: &[Box<dyn Detector>],
    evaluations: &[StrategyEvaluation],
    progress: Option<&ProgressBar>,
) -> ExtractionResult {
    let qualifying: Vec<(usize, &StrategyEvaluation)> = evaluations
        .iter()
        .filter(|e| e.is_applicable())
        .filter(|e| !e.environment.excluded || detectors[e.detector_index].scan_excluded())
        .enumerate()
        .collect();

    let mut by_directory: BTreeMap<PathBuf, Vec<(usize, &StrategyEvaluation)>> = BTreeMap::new();
    for (index, evaluation) in qualifying {
        by_directory
            .entry(evaluation.environment.directory.clone())
            .or_default()
            .push((index, evaluation));
    }

    let mut details: Vec<(PathBuf, usize, ExtractionDetail)> = by_directory
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .flat_map(|(directory, group)| {
            group
                .into_iter()
                .map(|(index, evaluation)| {
                    let detail = run_detector(detectors, evaluation, index);
                    if let Some(progress) = progress {
                        progress.inc(1);
                    }
                    (directory.clone(), evaluation.detector_index, detail)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    details.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

    let mut result = ExtractionResult::default();
    for (_, _, detail) in details {
        match (&detail.extractable, &detail.extraction) {
            (extractable, _) if !extractable.passed() => {
                result.failed.insert(detail.detector_type);
            }
            (_, Some(Extraction::Success { graph, project })) => {
                result.successful.insert(detail.detector_type);
                result.code_locations.push(DetectCodeLocation {
                    detector_type: detail.detector_type,
                    source_path: detail.directory.clone(),
                    graph: graph.clone(),
                });
                if let Some(identity) = project {
                    result.candidates.push(ProjectNameVersionCandidate {
                        detector_type: detail.detector_type,
                        depth: detail.depth,
                        identity: identity.clone(),
                    });
                }
            }
            _ => {
                result.failed.insert(detail.detector_type);
            }
        }
        result.details.push(detail);
    }

    result
}

fn run_detector(
    detectors: &[Box<dyn Detector>],
    evaluation: &StrategyEvaluation,
    extraction_index: usize,
) -> ExtractionDetail {
    let detector = &detectors[evaluation.detector_index];
    let environment = &evaluation.environment;

    let extractable = detector.extractable(environment);
    let extraction = if extractable.passed() {
        let id = ExtractionId {
            detector_type: detector.detector_type(),
            index: extraction_index,
        };
        Some(detector.extract(environment, &id))
    } else {
        None
    };

    ExtractionDetail {
        detector_type: detector.detector_type(),
        detector_name: detector.name(),
        directory: environment.directory.clone(),
        depth: environment.depth,
        extractable,
        extraction,
    }
}

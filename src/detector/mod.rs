use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::executable::{ExecutableFinder, ExecutableRunner};
use crate::graph::DependencyGraph;
use crate::inspector::InspectorManager;
use crate::models::{DetectorType, ProjectIdentity};

pub mod cargo;
pub mod go;
pub mod gradle;
pub mod npm;
pub mod nuget;
pub mod pip;
pub mod yarn;

/// Immutable evaluation context for one visited directory.
#[derive(Debug, Clone)]
pub struct DetectorEnvironment {
    pub directory: PathBuf,
    /// Traversal depth below the source root (root itself is 0).
    pub depth: usize,
    /// Reached through a deny-listed directory (vendored/nested path).
    pub excluded: bool,
    /// When set, only the named detector is evaluated.
    pub forced_detector: Option<DetectorType>,
}

impl DetectorEnvironment {
    pub fn new(directory: impl Into<PathBuf>, depth: usize, excluded: bool) -> Self {
        DetectorEnvironment {
            directory: directory.into(),
            depth,
            excluded,
            forced_detector: None,
        }
    }
}

/// Tagged outcome of a single detector phase. Purely descriptive.
///
/// `ExecutableNotFound` and `InspectorNotFound` mean the manifest was found
/// but the toolchain to analyze it is absent; reporting keeps them distinct
/// from a missing manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorResult {
    Passed,
    FileNotFound { pattern: String },
    ExecutableNotFound { name: String },
    InspectorNotFound { name: String },
    Failed { reason: String },
}

impl DetectorResult {
    pub fn file_not_found(pattern: impl Into<String>) -> Self {
        DetectorResult::FileNotFound { pattern: pattern.into() }
    }

    pub fn executable_not_found(name: impl Into<String>) -> Self {
        DetectorResult::ExecutableNotFound { name: name.into() }
    }

    pub fn inspector_not_found(name: impl Into<String>) -> Self {
        DetectorResult::InspectorNotFound { name: name.into() }
    }

    pub fn passed(&self) -> bool {
        matches!(self, DetectorResult::Passed)
    }

    /// Toolchain-absent outcomes (configuration issue, not a missing manifest).
    pub fn tool_missing(&self) -> bool {
        matches!(
            self,
            DetectorResult::ExecutableNotFound { .. } | DetectorResult::InspectorNotFound { .. }
        )
    }

    pub fn description(&self) -> String {
        match self {
            DetectorResult::Passed => "passed".to_string(),
            DetectorResult::FileNotFound { pattern } => {
                format!("no file matching {}", pattern)
            }
            DetectorResult::ExecutableNotFound { name } => {
                format!("executable not found: {}", name)
            }
            DetectorResult::InspectorNotFound { name } => {
                format!("inspector not found: {}", name)
            }
            DetectorResult::Failed { reason } => format!("failed: {}", reason),
        }
    }
}

/// Identifies one extraction within a run, for diagnostics and scratch naming.
#[derive(Debug, Clone)]
pub struct ExtractionId {
    pub detector_type: DetectorType,
    pub index: usize,
}

impl std::fmt::Display for ExtractionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.detector_type, self.index)
    }
}

/// Result of the final detector phase: a dependency graph plus optional
/// authoritative project identity, or a recorded failure.
#[derive(Debug, Clone)]
pub enum Extraction {
    Success {
        graph: DependencyGraph,
        project: Option<ProjectIdentity>,
    },
    Failure {
        error: String,
    },
}

impl Extraction {
    pub fn success(graph: DependencyGraph) -> Self {
        Extraction::Success { graph, project: None }
    }

    pub fn success_with_project(graph: DependencyGraph, project: ProjectIdentity) -> Self {
        Extraction::Success { graph, project: Some(project) }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Extraction::Failure { error: error.into() }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, Extraction::Success { .. })
    }
}

/// Shared collaborators handed to detectors at registration time.
pub struct DetectorContext {
    pub finder: ExecutableFinder,
    pub inspectors: InspectorManager,
    pub runner: ExecutableRunner,
}

impl DetectorContext {
    pub fn new(finder: ExecutableFinder, timeout: Duration) -> Self {
        DetectorContext {
            finder,
            inspectors: InspectorManager::new(),
            runner: ExecutableRunner::new(timeout),
        }
    }
}

/// One ecosystem's detection logic, evaluated against one directory at a
/// time through an immutable [`DetectorEnvironment`].
///
/// Phase contract:
/// - `applicable` is a pure, idempotent, filesystem-read-only check.
/// - `extractable` may probe for executables or provision inspectors.
/// - `extract` runs only after both prior phases passed; any tool failure
///   is returned as [`Extraction::Failure`], never propagated as a fault.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detector_type(&self) -> DetectorType;

    fn applicable(&self, environment: &DetectorEnvironment) -> DetectorResult;

    fn extractable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        let _ = environment;
        DetectorResult::Passed
    }

    fn extract(&self, environment: &DetectorEnvironment, id: &ExtractionId) -> Extraction;

    /// File names under the directory that made this detector applicable;
    /// recorded by tree search for diagnostics.
    fn matched_files(&self, environment: &DetectorEnvironment) -> Vec<String> {
        let _ = environment;
        Vec::new()
    }

    /// Whether extraction may run in deny-listed (vendored) directories.
    /// Per-ecosystem policy; every shipped detector opts out.
    fn scan_excluded(&self) -> bool {
        false
    }
}

/// All detectors in registration order.
///
/// Registration order is the mutual-exclusivity and priority policy:
/// within an ecosystem, lockfile-style detectors come before CLI-style
/// ones. The engine itself never enforces exclusivity.
pub fn registry(context: Arc<DetectorContext>) -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(cargo::CargoDetector::new()),
        Box::new(go::GoDepsDetector::new()),
        Box::new(go::GoModDetector::new(Arc::clone(&context))),
        Box::new(gradle::GradleDetector::new(Arc::clone(&context))),
        Box::new(npm::NpmDetector::new()),
        Box::new(yarn::YarnDetector::new()),
        Box::new(nuget::NugetDetector::new()),
        Box::new(pip::PipDetector::new(context)),
    ]
}

/// Non-recursive listing of file names in `dir` matching `pattern`.
///
/// A pattern is either an exact file name or a `*.ext` suffix glob.
/// Results are sorted for reproducibility.
pub(crate) fn find_matching(dir: &Path, pattern: &str) -> Vec<String> {
    let mut matches = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return matches,
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let matched = match pattern.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix),
            None => name == pattern,
        };
        if matched {
            matches.push(name);
        }
    }

    matches.sort();
    matches
}

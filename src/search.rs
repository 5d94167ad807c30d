use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::detector::{Detector, DetectorEnvironment, DetectorResult};
use crate::models::DetectorType;

/// Tree search configuration, read-only during a run.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum traversal depth below the source root (root is depth 0).
    pub max_depth: usize,
    /// Directory names flagged as excluded (vendored dependency trees).
    pub excluded_directories: Vec<String>,
    /// When set, only the named detector is evaluated.
    pub forced_detector: Option<DetectorType>,
}

/// Recorded outcome of one detector's applicability phase against one
/// directory. Every registered detector produces one of these per visited
/// directory, pass or fail — diagnostics depend on the full record.
#[derive(Debug, Clone)]
pub struct StrategyEvaluation {
    /// Index into the detector registry.
    pub detector_index: usize,
    pub detector_type: DetectorType,
    pub detector_name: &'static str,
    pub environment: DetectorEnvironment,
    pub applicable: DetectorResult,
    /// File names that made the detector applicable.
    pub matched_files: Vec<String>,
}

impl StrategyEvaluation {
    pub fn is_applicable(&self) -> bool {
        self.applicable.passed()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub evaluations: Vec<StrategyEvaluation>,
}

impl SearchResult {
    pub fn applicable(&self) -> impl Iterator<Item = &StrategyEvaluation> {
        self.evaluations.iter().filter(|e| e.is_applicable())
    }
}

/// Recursively visit `root` and run every registered detector's
/// applicability phase at each directory.
///
/// Traversal is lexicographic so results are reproducible on an unmodified
/// tree. Deny-listed directories are still visited for bookkeeping but
/// their environments carry the excluded flag. An unreadable source root
/// is the one hard failure that aborts the run.
pub fn search(
    root: &Path,
    detectors: &[Box<dyn Detector>],
    options: &SearchOptions,
) -> Result<SearchResult> {
    std::fs::read_dir(root)
        .with_context(|| format!("source directory unreadable: {}", root.display()))?;

    let mut evaluations = Vec::new();

    let walker = WalkDir::new(root)
        .max_depth(options.max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_type().is_dir());

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // Unreadable subdirectories are skipped, not fatal.
            Err(_) => continue,
        };

        let directory = entry.path().to_path_buf();
        let depth = entry.depth();
        let excluded = is_excluded(root, &directory, &options.excluded_directories);

        let mut environment = DetectorEnvironment::new(&directory, depth, excluded);
        environment.forced_detector = options.forced_detector;

        for (index, detector) in detectors.iter().enumerate() {
            if let Some(forced) = options.forced_detector {
                if detector.detector_type() != forced {
                    continue;
                }
            }

            let applicable = detector.applicable(&environment);
            let matched_files = if applicable.passed() {
                detector.matched_files(&environment)
            } else {
                Vec::new()
            };

            evaluations.push(StrategyEvaluation {
                detector_index: index,
                detector_type: detector.detector_type(),
                detector_name: detector.name(),
                environment: environment.clone(),
                applicable,
                matched_files,
            });
        }
    }

    Ok(SearchResult { evaluations })
}

/// A directory is excluded when any path component below the root matches
/// the deny list, including the directory itself.
fn is_excluded(root: &Path, directory: &PathBuf, excluded_directories: &[String]) -> bool {
    let relative = match directory.strip_prefix(root) {
        Ok(relative) => relative,
        Err(_) => return false,
    };
    relative.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        excluded_directories.iter().any(|excluded| excluded == &name)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::detector::{registry, DetectorContext};
    use crate::executable::ExecutableFinder;

    use super::*;

    fn test_detectors() -> Vec<Box<dyn Detector>> {
        registry(Arc::new(DetectorContext::new(
            ExecutableFinder::with_paths(Vec::new()),
            Duration::from_secs(1),
        )))
    }

    fn options() -> SearchOptions {
        SearchOptions {
            max_depth: 5,
            excluded_directories: vec!["node_modules".to_string(), "vendor".to_string()],
            forced_detector: None,
        }
    }

    #[test]
    fn test_empty_tree_has_no_applicable_evaluations() {
        let dir = tempfile::tempdir().unwrap();
        let detectors = test_detectors();
        let result = search(dir.path(), &detectors, &options()).unwrap();

        assert_eq!(result.evaluations.len(), detectors.len());
        assert_eq!(result.applicable().count(), 0);
    }

    #[test]
    fn test_every_detector_recorded_per_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module example.com/app\n").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let detectors = test_detectors();
        let result = search(dir.path(), &detectors, &options()).unwrap();

        // Two directories visited, full record for each.
        assert_eq!(result.evaluations.len(), detectors.len() * 2);
        let applicable: Vec<_> = result.applicable().collect();
        assert_eq!(applicable.len(), 1);
        assert_eq!(applicable[0].detector_type, DetectorType::GoMod);
        assert_eq!(applicable[0].matched_files, vec!["go.mod".to_string()]);
        assert_eq!(applicable[0].environment.depth, 0);
    }

    #[test]
    fn test_deny_listed_directory_visited_but_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("node_modules").join("leftpad");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("package-lock.json"), "{}").unwrap();

        let detectors = test_detectors();
        let result = search(dir.path(), &detectors, &options()).unwrap();

        let applicable: Vec<_> = result.applicable().collect();
        assert_eq!(applicable.len(), 1);
        assert!(applicable[0].environment.excluded);
        assert_eq!(applicable[0].environment.depth, 2);
    }

    #[test]
    fn test_max_depth_limits_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("package-lock.json"), "{}").unwrap();

        let detectors = test_detectors();
        let shallow = SearchOptions { max_depth: 2, ..options() };
        let result = search(dir.path(), &detectors, &shallow).unwrap();
        assert_eq!(result.applicable().count(), 0);

        let result = search(dir.path(), &detectors, &options()).unwrap();
        assert_eq!(result.applicable().count(), 1);
    }

    #[test]
    fn test_forced_detector_restricts_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module example.com/app\n").unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();

        let detectors = test_detectors();
        let forced = SearchOptions {
            forced_detector: Some(DetectorType::Npm),
            ..options()
        };
        let result = search(dir.path(), &detectors, &forced).unwrap();

        assert_eq!(result.evaluations.len(), 1);
        assert_eq!(result.evaluations[0].detector_type, DetectorType::Npm);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let detectors = test_detectors();
        assert!(search(&missing, &detectors, &options()).is_err());
    }

    #[test]
    fn test_search_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yarn.lock"), "").unwrap();

        let detectors = test_detectors();
        let first = search(dir.path(), &detectors, &options()).unwrap();
        let second = search(dir.path(), &detectors, &options()).unwrap();

        let kinds = |r: &SearchResult| -> Vec<(DetectorType, bool)> {
            r.evaluations
                .iter()
                .map(|e| (e.detector_type, e.is_applicable()))
                .collect()
        };
        assert_eq!(kinds(&first), kinds(&second));
    }
}

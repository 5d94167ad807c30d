use std::path::Path;

use chrono::Utc;

use crate::models::{DetectorType, NameVersion, ProjectIdentity};

/// A project identity reported by one detector's extraction, with enough
/// provenance to rank it. Ephemeral; consumed once by [`decide`].
#[derive(Debug, Clone)]
pub struct ProjectNameVersionCandidate {
    pub detector_type: DetectorType,
    pub depth: usize,
    pub identity: ProjectIdentity,
}

/// User-facing knobs for the identity decision.
#[derive(Debug, Clone, Default)]
pub struct ProjectDecisionOptions {
    pub override_name: Option<String>,
    pub override_version: Option<String>,
    pub preferred_detector: Option<DetectorType>,
    /// Version applied when neither override nor candidate supplies one.
    pub default_version: String,
}

/// Choose the project name/version. The order is total: explicit override,
/// then preferred category, then smallest depth with the fixed category
/// priority breaking ties, then the source directory's final segment plus
/// the configured default version.
pub fn decide(
    source_root: &Path,
    candidates: &[ProjectNameVersionCandidate],
    options: &ProjectDecisionOptions,
) -> NameVersion {
    let chosen = select_candidate(candidates, options.preferred_detector);

    let name = options
        .override_name
        .clone()
        .or_else(|| chosen.map(|c| c.identity.name.clone()))
        .unwrap_or_else(|| fallback_name(source_root));

    let version = options
        .override_version
        .clone()
        .or_else(|| chosen.and_then(|c| c.identity.version.clone()))
        .unwrap_or_else(|| options.default_version.clone());

    NameVersion { name, version }
}

fn select_candidate<'a>(
    candidates: &'a [ProjectNameVersionCandidate],
    preferred: Option<DetectorType>,
) -> Option<&'a ProjectNameVersionCandidate> {
    if let Some(preferred) = preferred {
        let preferred_match = candidates
            .iter()
            .filter(|c| c.detector_type == preferred)
            .min_by_key(|c| c.depth);
        if preferred_match.is_some() {
            return preferred_match;
        }
    }

    candidates
        .iter()
        .min_by_key(|c| (c.depth, c.detector_type.priority()))
}

fn fallback_name(source_root: &Path) -> String {
    source_root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_root.to_string_lossy().into_owned())
}

/// Timestamp form of the default version, e.g. `2024-03-01T12:00:00Z`.
pub fn timestamp_version() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(detector_type: DetectorType, depth: usize, name: &str) -> ProjectNameVersionCandidate {
        ProjectNameVersionCandidate {
            detector_type,
            depth,
            identity: ProjectIdentity::new(name, "1.0"),
        }
    }

    fn options() -> ProjectDecisionOptions {
        ProjectDecisionOptions {
            default_version: "default".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_smallest_depth_wins() {
        let candidates = vec![
            candidate(DetectorType::Npm, 2, "deep"),
            candidate(DetectorType::Cargo, 0, "shallow"),
            candidate(DetectorType::Pip, 1, "middle"),
        ];
        let decided = decide(Path::new("/scan/app"), &candidates, &options());
        assert_eq!(decided.name, "shallow");
    }

    #[test]
    fn test_equal_depth_breaks_tie_by_category_priority() {
        let candidates = vec![
            candidate(DetectorType::Pip, 0, "python"),
            candidate(DetectorType::Cargo, 0, "rust"),
        ];
        let decided = decide(Path::new("/scan/app"), &candidates, &options());
        assert_eq!(decided.name, "rust");
    }

    #[test]
    fn test_user_override_always_wins() {
        let candidates = vec![candidate(DetectorType::Cargo, 0, "detected")];
        let opts = ProjectDecisionOptions {
            override_name: Some("forced".to_string()),
            override_version: Some("9.9".to_string()),
            ..options()
        };
        let decided = decide(Path::new("/scan/app"), &candidates, &opts);
        assert_eq!(decided, NameVersion::new("forced", "9.9"));
    }

    #[test]
    fn test_preferred_detector_beats_depth() {
        let candidates = vec![
            candidate(DetectorType::Cargo, 0, "rust"),
            candidate(DetectorType::Npm, 3, "node"),
        ];
        let opts = ProjectDecisionOptions {
            preferred_detector: Some(DetectorType::Npm),
            ..options()
        };
        let decided = decide(Path::new("/scan/app"), &candidates, &opts);
        assert_eq!(decided.name, "node");
    }

    #[test]
    fn test_preferred_detector_without_candidate_falls_through() {
        let candidates = vec![candidate(DetectorType::Cargo, 1, "rust")];
        let opts = ProjectDecisionOptions {
            preferred_detector: Some(DetectorType::Npm),
            ..options()
        };
        let decided = decide(Path::new("/scan/app"), &candidates, &opts);
        assert_eq!(decided.name, "rust");
    }

    #[test]
    fn test_no_candidates_falls_back_to_directory_name() {
        let decided = decide(Path::new("/scan/app"), &[], &options());
        assert_eq!(decided, NameVersion::new("app", "default"));
    }

    #[test]
    fn test_candidate_without_version_uses_default() {
        let candidates = vec![ProjectNameVersionCandidate {
            detector_type: DetectorType::GoMod,
            depth: 0,
            identity: ProjectIdentity::named("example.com/app"),
        }];
        let decided = decide(Path::new("/scan/app"), &candidates, &options());
        assert_eq!(decided, NameVersion::new("example.com/app", "default"));
    }

    #[test]
    fn test_decision_is_deterministic() {
        let candidates = vec![
            candidate(DetectorType::Npm, 1, "one"),
            candidate(DetectorType::Yarn, 1, "two"),
        ];
        let first = decide(Path::new("/scan/app"), &candidates, &options());
        let second = decide(Path::new("/scan/app"), &candidates, &options());
        assert_eq!(first, second);
    }
}

use std::path::Path;

use regex::Regex;

use crate::graph::{Dependency, DependencyGraph, ExternalId, Forge};
use crate::models::DetectorType;

use super::{Detector, DetectorEnvironment, DetectorResult, Extraction, ExtractionId};

const LOCK_FILE: &str = "yarn.lock";

/// Detects yarn projects via `yarn.lock`.
///
/// The lockfile has no hierarchy or project identity, so every resolved
/// package lands in the root set.
pub struct YarnDetector;

impl YarnDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for YarnDetector {
    fn name(&self) -> &'static str {
        "Yarn Lock File"
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::Yarn
    }

    fn applicable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        if environment.directory.join(LOCK_FILE).is_file() {
            DetectorResult::Passed
        } else {
            DetectorResult::file_not_found(LOCK_FILE)
        }
    }

    fn matched_files(&self, environment: &DetectorEnvironment) -> Vec<String> {
        if environment.directory.join(LOCK_FILE).is_file() {
            vec![LOCK_FILE.to_string()]
        } else {
            Vec::new()
        }
    }

    fn extract(&self, environment: &DetectorEnvironment, _id: &ExtractionId) -> Extraction {
        match parse_yarn_lock(&environment.directory.join(LOCK_FILE)) {
            Ok(graph) => Extraction::success(graph),
            Err(e) => Extraction::failure(format!("{}: {}", LOCK_FILE, e)),
        }
    }
}

/// Parse `yarn.lock` — custom line-based format of `name@spec:` headers
/// followed by an indented `version "x.y.z"` line.
fn parse_yarn_lock(path: &Path) -> Result<DependencyGraph, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;

    let header_re = Regex::new(r#"^"?(@?[^@"]+)@"#).map_err(|e| e.to_string())?;
    let version_re = Regex::new(r#"^\s+version\s+"([^"]+)""#).map_err(|e| e.to_string())?;

    let mut graph = DependencyGraph::new();
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            continue;
        }

        // Package header; comma-separated specs share one entry.
        let trimmed = line.trim_end_matches(':');
        let first_spec = trimmed.split(", ").next().unwrap_or(trimmed).trim_matches('"');
        let caps = match header_re.captures(first_spec) {
            Some(caps) => caps,
            None => continue,
        };
        let name = caps[1].to_string();

        let mut version = None;
        while let Some(next) = lines.peek() {
            if next.is_empty() {
                break;
            }
            if let Some(vcaps) = version_re.captures(next) {
                version = Some(vcaps[1].to_string());
                lines.next();
                break;
            }
            lines.next();
        }

        if let Some(version) = version {
            graph.add_root(Dependency::new(ExternalId::name_version(
                Forge::Npmjs,
                name,
                version,
            )));
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yarn_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);
        std::fs::write(
            &path,
            r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1

"@babel/code-frame@^7.0.0":
  version "7.22.13"
  resolved "https://registry.yarnpkg.com/@babel/code-frame"

express@^4.18.2, express@~4.18.0:
  version "4.18.2"
  resolved "https://registry.yarnpkg.com/express"
"#,
        )
        .unwrap();

        let graph = parse_yarn_lock(&path).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(graph.is_root(&ExternalId::name_version(
            Forge::Npmjs,
            "@babel/code-frame",
            "7.22.13"
        )));
        assert!(graph.is_root(&ExternalId::name_version(Forge::Npmjs, "express", "4.18.2")));
    }
}

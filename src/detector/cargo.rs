use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::graph::{Dependency, DependencyGraph, ExternalId, Forge};
use crate::models::{DetectorType, ProjectIdentity};

use super::{Detector, DetectorEnvironment, DetectorResult, Extraction, ExtractionId};

#[derive(Debug, Deserialize)]
struct CargoLock {
    #[serde(default)]
    package: Vec<CargoLockPackage>,
}

#[derive(Debug, Deserialize)]
struct CargoLockPackage {
    name: String,
    version: String,
    /// Entries are `name` or `name version` (or `name version (source)`).
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CargoManifest {
    package: Option<CargoManifestPackage>,
    #[serde(default)]
    dependencies: HashMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
struct CargoManifestPackage {
    name: Option<String>,
    version: Option<toml::Value>,
}

/// Detects Rust projects via `Cargo.lock` (full resolved graph) or
/// `Cargo.toml` (declared dependencies only).
pub struct CargoDetector;

impl CargoDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for CargoDetector {
    fn name(&self) -> &'static str {
        "Cargo Lock File"
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::Cargo
    }

    fn applicable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        let dir = &environment.directory;
        if dir.join("Cargo.lock").is_file() || dir.join("Cargo.toml").is_file() {
            DetectorResult::Passed
        } else {
            DetectorResult::file_not_found("Cargo.toml")
        }
    }

    fn matched_files(&self, environment: &DetectorEnvironment) -> Vec<String> {
        ["Cargo.lock", "Cargo.toml"]
            .iter()
            .filter(|name| environment.directory.join(name).is_file())
            .map(|name| name.to_string())
            .collect()
    }

    fn extract(&self, environment: &DetectorEnvironment, _id: &ExtractionId) -> Extraction {
        let dir = &environment.directory;
        let project = read_manifest_identity(&dir.join("Cargo.toml"));

        let lock_path = dir.join("Cargo.lock");
        let graph = if lock_path.is_file() {
            match parse_cargo_lock(&lock_path) {
                Ok(graph) => graph,
                Err(e) => return Extraction::failure(format!("Cargo.lock: {}", e)),
            }
        } else {
            match declared_dependency_graph(&dir.join("Cargo.toml"), project.as_ref()) {
                Ok(graph) => graph,
                Err(e) => return Extraction::failure(format!("Cargo.toml: {}", e)),
            }
        };

        match project {
            Some(project) => Extraction::success_with_project(graph, project),
            None => Extraction::success(graph),
        }
    }
}

fn read_manifest_identity(manifest_path: &Path) -> Option<ProjectIdentity> {
    let content = std::fs::read_to_string(manifest_path).ok()?;
    let manifest: CargoManifest = toml::from_str(&content).ok()?;
    let package = manifest.package?;
    let name = package.name?;
    let version = package.version.and_then(|v| v.as_str().map(str::to_string));
    Some(ProjectIdentity { name, version })
}

/// Build the resolved graph from `Cargo.lock`.
///
/// Every package starts as a root; edges from `dependencies` entries demote
/// referenced packages, so the surviving roots are the parentless packages
/// (the workspace members).
fn parse_cargo_lock(lock_path: &Path) -> Result<DependencyGraph, String> {
    let content = std::fs::read_to_string(lock_path).map_err(|e| e.to_string())?;
    let lock: CargoLock = toml::from_str(&content).map_err(|e| e.to_string())?;

    let mut graph = DependencyGraph::new();
    let mut by_name: HashMap<&str, Vec<&CargoLockPackage>> = HashMap::new();
    for package in &lock.package {
        by_name.entry(package.name.as_str()).or_default().push(package);
        graph.add_root(Dependency::new(external_id(&package.name, &package.version)));
    }

    for package in &lock.package {
        let parent = external_id(&package.name, &package.version);
        for spec in &package.dependencies {
            if let Some(child) = resolve_dependency_spec(spec, &by_name) {
                graph.add_edge(&parent, &child);
            }
        }
    }

    Ok(graph)
}

/// Declared-only fallback when no lockfile exists: direct dependencies as
/// children of the package root, versions taken verbatim from requirements.
fn declared_dependency_graph(
    manifest_path: &Path,
    project: Option<&ProjectIdentity>,
) -> Result<DependencyGraph, String> {
    let content = std::fs::read_to_string(manifest_path).map_err(|e| e.to_string())?;
    let manifest: CargoManifest = toml::from_str(&content).map_err(|e| e.to_string())?;

    let mut graph = DependencyGraph::new();
    let root_name = project.map(|p| p.name.as_str()).unwrap_or("unknown");
    let root_version = project
        .and_then(|p| p.version.as_deref())
        .unwrap_or("unspecified");
    let root = external_id(root_name, root_version);
    graph.add_root(Dependency::new(root.clone()));

    let mut names: Vec<&String> = manifest.dependencies.keys().collect();
    names.sort();
    for name in names {
        let requirement = match &manifest.dependencies[name] {
            toml::Value::String(v) => v.clone(),
            toml::Value::Table(table) => table
                .get("version")
                .and_then(|v| v.as_str())
                .unwrap_or("*")
                .to_string(),
            _ => "*".to_string(),
        };
        graph.add_child(&root, Dependency::new(external_id(name, &requirement)));
    }

    Ok(graph)
}

fn resolve_dependency_spec(
    spec: &str,
    by_name: &HashMap<&str, Vec<&CargoLockPackage>>,
) -> Option<ExternalId> {
    let mut parts = spec.split_whitespace();
    let name = parts.next()?;
    let version = parts.next();

    let candidates = by_name.get(name)?;
    let package = match version {
        Some(version) => candidates.iter().find(|p| p.version == version)?,
        None => candidates.first()?,
    };
    Some(external_id(&package.name, &package.version))
}

fn external_id(name: &str, version: &str) -> ExternalId {
    ExternalId::name_version(Forge::Crates, name, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCK: &str = r#"
version = 3

[[package]]
name = "my-app"
version = "0.1.0"
dependencies = [
 "serde",
 "libc 0.2.150",
]

[[package]]
name = "serde"
version = "1.0.150"
source = "registry+https://github.com/rust-lang/crates.io-index"
dependencies = [
 "libc 0.2.150",
]

[[package]]
name = "libc"
version = "0.2.150"
source = "registry+https://github.com/rust-lang/crates.io-index"
"#;

    #[test]
    fn test_parse_cargo_lock_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cargo.lock");
        std::fs::write(&path, LOCK).unwrap();

        let graph = parse_cargo_lock(&path).unwrap();
        assert_eq!(graph.node_count(), 3);

        let root = external_id("my-app", "0.1.0");
        assert!(graph.is_root(&root));
        assert!(!graph.is_root(&external_id("serde", "1.0.150")));
        assert_eq!(graph.children_of(&root).count(), 2);
        assert_eq!(
            graph.children_of(&external_id("serde", "1.0.150")).count(),
            1
        );
    }

    #[test]
    fn test_dev_dependency_cycle_keeps_a_root() {
        // Two workspace members depending on each other, which cargo emits
        // for dev-dependency cycles. The root set must not end up empty.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cargo.lock");
        std::fs::write(
            &path,
            r#"
version = 3

[[package]]
name = "alpha"
version = "0.1.0"
dependencies = [
 "beta",
]

[[package]]
name = "beta"
version = "0.1.0"
dependencies = [
 "alpha",
]
"#,
        )
        .unwrap();

        let graph = parse_cargo_lock(&path).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.root_ids().count(), 1);

        let alpha = external_id("alpha", "0.1.0");
        assert!(graph.is_root(&alpha));
        assert!(graph
            .children_of(&alpha)
            .any(|c| c == &external_id("beta", "0.1.0")));
    }

    #[test]
    fn test_declared_fallback_without_lock() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Cargo.toml"),
            r#"
[package]
name = "tool"
version = "2.0.0"

[dependencies]
anyhow = "1"
serde = { version = "1", features = ["derive"] }
"#,
        )
        .unwrap();

        let env = DetectorEnvironment::new(dir.path(), 0, false);
        let detector = CargoDetector::new();
        assert!(detector.applicable(&env).passed());

        let id = ExtractionId { detector_type: DetectorType::Cargo, index: 0 };
        match detector.extract(&env, &id) {
            Extraction::Success { graph, project } => {
                assert_eq!(project, Some(ProjectIdentity::new("tool", "2.0.0")));
                let root = external_id("tool", "2.0.0");
                assert!(graph.is_root(&root));
                assert_eq!(graph.children_of(&root).count(), 2);
            }
            Extraction::Failure { error } => panic!("unexpected failure: {}", error),
        }
    }

    #[test]
    fn test_not_applicable_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let env = DetectorEnvironment::new(dir.path(), 0, false);
        assert_eq!(
            CargoDetector::new().applicable(&env),
            DetectorResult::file_not_found("Cargo.toml")
        );
    }
}

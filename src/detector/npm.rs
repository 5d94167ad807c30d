use std::path::Path;

use serde_json::Value;

use crate::graph::{Dependency, DependencyGraph, ExternalId, Forge};
use crate::models::{DetectorType, ProjectIdentity};

use super::{Detector, DetectorEnvironment, DetectorResult, Extraction, ExtractionId};

const LOCK_FILE: &str = "package-lock.json";

/// Detects npm projects via `package-lock.json`.
///
/// Lockfile v1 nests a `dependencies` map and yields full parent/child
/// edges; v2/v3 store a flat `packages` map whose entries become children
/// of the lockfile root.
pub struct NpmDetector;

impl NpmDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for NpmDetector {
    fn name(&self) -> &'static str {
        "Npm Package Lock"
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::Npm
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
        match parse_package_lock(&environment.directory.join(LOCK_FILE)) {
            Ok((graph, project)) => Extraction::success_with_project(graph, project),
            Err(e) => Extraction::failure(format!("{}: {}", LOCK_FILE, e)),
        }
    }
}

pub(crate) fn parse_package_lock(path: &Path) -> Result<(DependencyGraph, ProjectIdentity), String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let json: Value = serde_json::from_str(&content).map_err(|e| e.to_string())?;

    let name = json
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let version = json.get("version").and_then(Value::as_str).map(str::to_string);

    let mut graph = DependencyGraph::new();
    let root = npm_id(&name, version.as_deref().unwrap_or("unspecified"));
    graph.add_root(Dependency::new(root.clone()));

    if let Some(packages) = json.get("packages").and_then(Value::as_object) {
        // Lockfile v2/v3: flat map keyed by install path.
        for (pkg_path, info) in packages {
            if pkg_path.is_empty() {
                continue;
            }
            // "node_modules/@scope/foo" and nested installs both reduce to
            // the name after the last "node_modules/" segment.
            let pkg_name = match pkg_path.rsplit_once("node_modules/") {
                Some((_, name)) => name,
                None => pkg_path.as_str(),
            };
            let pkg_version = info.get("version").and_then(Value::as_str).unwrap_or("*");
            graph.add_child(&root, Dependency::new(npm_id(pkg_name, pkg_version)));
        }
    } else if let Some(dependencies) = json.get("dependencies").and_then(Value::as_object) {
        // Lockfile v1: nested maps carry the real hierarchy.
        add_nested_dependencies(&mut graph, &root, dependencies);
    }

    Ok((graph, ProjectIdentity { name, version }))
}

fn add_nested_dependencies(
    graph: &mut DependencyGraph,
    parent: &ExternalId,
    dependencies: &serde_json::Map<String, Value>,
) {
    for (name, info) in dependencies {
        let version = info.get("version").and_then(Value::as_str).unwrap_or("*");
        let id = npm_id(name, version);
        graph.add_child(parent, Dependency::new(id.clone()));

        if let Some(nested) = info.get("dependencies").and_then(Value::as_object) {
            add_nested_dependencies(graph, &id, nested);
        }
    }
}

fn npm_id(name: &str, version: &str) -> ExternalId {
    ExternalId::name_version(Forge::Npmjs, name, version)
}

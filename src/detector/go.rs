use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::executable::Executable;
use crate::graph::{Dependency, DependencyGraph, ExternalId, Forge};
use crate::models::{DetectorType, ProjectIdentity};

use super::{Detector, DetectorContext, DetectorEnvironment, DetectorResult, Extraction, ExtractionId};

const GODEPS_FILE: &str = "Godeps/Godeps.json";
const GO_MOD_FILE: &str = "go.mod";

#[derive(Debug, Deserialize)]
struct GodepsFile {
    #[serde(rename = "ImportPath")]
    import_path: String,
    #[serde(rename = "Deps", default)]
    deps: Vec<GodepsEntry>,
}

#[derive(Debug, Deserialize)]
struct GodepsEntry {
    #[serde(rename = "ImportPath")]
    import_path: String,
    #[serde(rename = "Rev", default)]
    rev: Option<String>,
    #[serde(rename = "Comment", default)]
    comment: Option<String>,
}

/// Detects godep-managed projects by their checked-in `Godeps/Godeps.json`
/// lock data. Pure parse, no toolchain required.
pub struct GoDepsDetector;

impl GoDepsDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for GoDepsDetector {
    fn name(&self) -> &'static str {
        "Go Deps Lock File"
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::GoDeps
    }

    fn applicable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        if environment.directory.join(GODEPS_FILE).is_file() {
            DetectorResult::Passed
        } else {
            DetectorResult::file_not_found(GODEPS_FILE)
        }
    }

    fn matched_files(&self, environment: &DetectorEnvironment) -> Vec<String> {
        if environment.directory.join(GODEPS_FILE).is_file() {
            vec![GODEPS_FILE.to_string()]
        } else {
            Vec::new()
        }
    }

    fn extract(&self, environment: &DetectorEnvironment, _id: &ExtractionId) -> Extraction {
        match parse_godeps(&environment.directory.join(GODEPS_FILE)) {
            Ok((graph, project)) => Extraction::success_with_project(graph, project),
            Err(e) => Extraction::failure(format!("{}: {}", GODEPS_FILE, e)),
        }
    }
}

fn parse_godeps(path: &Path) -> Result<(DependencyGraph, ProjectIdentity), String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let godeps: GodepsFile = serde_json::from_str(&content).map_err(|e| e.to_string())?;

    let mut graph = DependencyGraph::new();
    let root = golang_id(&godeps.import_path, "unspecified");
    graph.add_root(Dependency::new(root.clone()));

    for dep in &godeps.deps {
        // Comment carries the human tag (e.g. v1.2.0); Rev is the raw sha.
        let version = dep
            .comment
            .as_deref()
            .or(dep.rev.as_deref())
            .unwrap_or("unspecified");
        graph.add_child(&root, Dependency::new(golang_id(&dep.import_path, version)));
    }

    Ok((graph, ProjectIdentity::named(godeps.import_path)))
}

/// Detects Go module projects by `go.mod` and extracts the resolved module
/// list through the `go` toolchain.
pub struct GoModDetector {
    context: Arc<DetectorContext>,
}

impl GoModDetector {
    pub fn new(context: Arc<DetectorContext>) -> Self {
        GoModDetector { context }
    }
}

impl Detector for GoModDetector {
    fn name(&self) -> &'static str {
        "Go Mod Cli"
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::GoMod
    }

    fn applicable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        if environment.directory.join(GO_MOD_FILE).is_file() {
            DetectorResult::Passed
        } else {
            DetectorResult::file_not_found(GO_MOD_FILE)
        }
    }

    fn matched_files(&self, environment: &DetectorEnvironment) -> Vec<String> {
        if environment.directory.join(GO_MOD_FILE).is_file() {
            vec![GO_MOD_FILE.to_string()]
        } else {
            Vec::new()
        }
    }

    fn extractable(&self, _environment: &DetectorEnvironment) -> DetectorResult {
        if self.context.finder.find("go").is_some() {
            DetectorResult::Passed
        } else {
            DetectorResult::executable_not_found("go")
        }
    }

    fn extract(&self, environment: &DetectorEnvironment, _id: &ExtractionId) -> Extraction {
        let go_exe = match self.context.finder.find("go") {
            Some(path) => path,
            None => return Extraction::failure("go executable disappeared before extraction"),
        };

        let exe = Executable::new(go_exe, &environment.directory)
            .arg("list")
            .arg("-m")
            .arg("all");

        let output = match self.context.runner.run(&exe) {
            Ok(output) => output,
            Err(e) => return Extraction::failure(e),
        };
        if output.timed_out {
            return Extraction::failure("go list -m all timed out");
        }
        if !output.succeeded() {
            return Extraction::failure(format!(
                "go list -m all exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            ));
        }

        match parse_go_list(&output.stdout) {
            Some((graph, project)) => Extraction::success_with_project(graph, project),
            None => Extraction::failure("go list -m all produced no modules"),
        }
    }
}

/// Parse `go list -m all` output: the first line is the main module path,
/// each following line is `path version`.
fn parse_go_list(stdout: &str) -> Option<(DependencyGraph, ProjectIdentity)> {
    let mut lines = stdout.lines().filter(|l| !l.trim().is_empty());
    let main_line = lines.next()?;

    let mut main_parts = main_line.split_whitespace();
    let main_path = main_parts.next()?;
    let main_version = main_parts.next().unwrap_or("unspecified");

    let mut graph = DependencyGraph::new();
    let root = golang_id(main_path, main_version);
    graph.add_root(Dependency::new(root.clone()));

    for line in lines {
        let mut parts = line.split_whitespace();
        let path = match parts.next() {
            Some(path) => path,
            None => continue,
        };
        let version = parts.next().unwrap_or("unspecified");
        graph.add_child(&root, Dependency::new(golang_id(path, version)));
    }

    let project = ProjectIdentity {
        name: main_path.to_string(),
        version: (main_version != "unspecified").then(|| main_version.to_string()),
    };
    Some((graph, project))
}

fn golang_id(path: &str, version: &str) -> ExternalId {
    ExternalId::name_version(Forge::Golang, path, version)
}

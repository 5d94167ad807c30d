use std::sync::Arc;

use crate::executable::Executable;
use crate::graph::{Dependency, DependencyGraph, ExternalId, Forge};
use crate::inspector::PIP_INSPECTOR_NAME;
use crate::models::{DetectorType, ProjectIdentity};

use super::{Detector, DetectorContext, DetectorEnvironment, DetectorResult, Extraction, ExtractionId};

const MARKER_FILES: [&str; 3] = ["requirements.txt", "setup.py", "pyproject.toml"];

/// Detects Python projects and extracts the environment's dependency tree
/// through a provisioned inspector script.
pub struct PipDetector {
    context: Arc<DetectorContext>,
}

impl PipDetector {
    pub fn new(context: Arc<DetectorContext>) -> Self {
        PipDetector { context }
    }

    fn python_executable(&self) -> Option<std::path::PathBuf> {
        self.context
            .finder
            .find("python3")
            .or_else(|| self.context.finder.find("python"))
    }
}

impl Detector for PipDetector {
    fn name(&self) -> &'static str {
        "Pip Inspector"
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::Pip
    }

    fn applicable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        if MARKER_FILES
            .iter()
            .any(|name| environment.directory.join(name).is_file())
        {
            DetectorResult::Passed
        } else {
            DetectorResult::file_not_found("requirements.txt")
        }
    }

    fn matched_files(&self, environment: &DetectorEnvironment) -> Vec<String> {
        MARKER_FILES
            .iter()
            .filter(|name| environment.directory.join(name).is_file())
            .map(|name| name.to_string())
            .collect()
    }

    fn extractable(&self, _environment: &DetectorEnvironment) -> DetectorResult {
        if self.python_executable().is_none() {
            return DetectorResult::executable_not_found("python");
        }
        if self.context.inspectors.pip_inspector().is_err() {
            return DetectorResult::inspector_not_found(PIP_INSPECTOR_NAME);
        }
        DetectorResult::Passed
    }

    fn extract(&self, environment: &DetectorEnvironment, _id: &ExtractionId) -> Extraction {
        let python = match self.python_executable() {
            Some(path) => path,
            None => return Extraction::failure("python executable disappeared before extraction"),
        };
        let inspector = match self.context.inspectors.pip_inspector() {
            Ok(path) => path,
            Err(e) => return Extraction::failure(e),
        };

        let project_name = environment
            .directory
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        let mut exe = Executable::new(python, &environment.directory)
            .arg(inspector.to_string_lossy().into_owned())
            .arg(format!("--projectname={}", project_name));

        let requirements = environment.directory.join("requirements.txt");
        if requirements.is_file() {
            exe = exe.arg(format!("--requirements={}", requirements.display()));
        }

        let output = match self.context.runner.run(&exe) {
            Ok(output) => output,
            Err(e) => return Extraction::failure(e),
        };
        if output.timed_out {
            return Extraction::failure("pip inspector timed out");
        }
        if !output.succeeded() {
            return Extraction::failure(format!(
                "pip inspector exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            ));
        }

        match parse_inspector_tree(&output.stdout) {
            Some((graph, project)) => Extraction::success_with_project(graph, project),
            None => Extraction::failure("pip inspector produced no output"),
        }
    }
}

/// Parse the inspector's tree: `name==version` lines indented four spaces
/// per level, the first line being the project itself.
pub(crate) fn parse_inspector_tree(stdout: &str) -> Option<(DependencyGraph, ProjectIdentity)> {
    let mut graph = DependencyGraph::new();
    let mut stack: Vec<ExternalId> = Vec::new();
    let mut project: Option<ProjectIdentity> = None;

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let depth = (line.len() - line.trim_start_matches(' ').len()) / 4;
        let (name, version) = line.trim().split_once("==")?;
        let id = ExternalId::name_version(Forge::Pypi, name, version);

        if project.is_none() {
            project = Some(ProjectIdentity {
                name: name.to_string(),
                version: (version != "unspecified").then(|| version.to_string()),
            });
        }

        stack.truncate(depth);
        match stack.last() {
            Some(parent) => {
                let parent = parent.clone();
                graph.add_child(&parent, Dependency::new(id.clone()));
            }
            None => graph.add_root(Dependency::new(id.clone())),
        }
        stack.push(id);
    }

    project.map(|project| (graph, project))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::executable::ExecutableFinder;

    use super::*;

    #[test]
    fn test_parse_inspector_tree() {
        let stdout = "\
myproject==unspecified
    requests==2.31.0
        urllib3==2.0.7
        idna==3.4
    click==8.1.7
";
        let (graph, project) = parse_inspector_tree(stdout).unwrap();
        assert_eq!(project.name, "myproject");
        assert_eq!(project.version, None);

        let root = ExternalId::name_version(Forge::Pypi, "myproject", "unspecified");
        let requests = ExternalId::name_version(Forge::Pypi, "requests", "2.31.0");
        assert!(graph.is_root(&root));
        assert_eq!(graph.children_of(&root).count(), 2);
        assert_eq!(graph.children_of(&requests).count(), 2);
        assert_eq!(graph.node_count(), 5);
    }

    #[test]
    fn test_missing_python_reports_executable_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "requests\n").unwrap();

        let context = Arc::new(DetectorContext::new(
            ExecutableFinder::with_paths(Vec::new()),
            Duration::from_secs(1),
        ));
        let detector = PipDetector::new(context);
        let env = DetectorEnvironment::new(dir.path(), 0, false);
        assert!(detector.applicable(&env).passed());
        assert_eq!(
            detector.extractable(&env),
            DetectorResult::executable_not_found("python")
        );
    }

    #[test]
    fn test_applicable_on_pyproject_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pyproject.toml"), "[project]\nname = \"x\"\n").unwrap();

        let context = Arc::new(DetectorContext::new(
            ExecutableFinder::with_paths(Vec::new()),
            Duration::from_secs(1),
        ));
        let detector = PipDetector::new(context);
        let env = DetectorEnvironment::new(dir.path(), 0, false);
        assert!(detector.applicable(&env).passed());
        assert_eq!(detector.matched_files(&env), vec!["pyproject.toml".to_string()]);
    }
}

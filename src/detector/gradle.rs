use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;

use crate::executable::Executable;
use crate::graph::{Dependency, DependencyGraph, ExternalId, Forge};
use crate::models::{DetectorType, ProjectIdentity};

use super::{Detector, DetectorContext, DetectorEnvironment, DetectorResult, Extraction, ExtractionId};

const BUILD_FILES: [&str; 2] = ["build.gradle", "build.gradle.kts"];

/// Detects Gradle projects and extracts the resolved dependency tree by
/// running `gradle dependencies` (preferring the project's own wrapper).
pub struct GradleDetector {
    context: Arc<DetectorContext>,
}

impl GradleDetector {
    pub fn new(context: Arc<DetectorContext>) -> Self {
        GradleDetector { context }
    }

    fn gradle_program(&self, environment: &DetectorEnvironment) -> Option<PathBuf> {
        let wrapper = environment.directory.join("gradlew");
        if wrapper.is_file() {
            return Some(wrapper);
        }
        self.context.finder.find("gradle")
    }
}

impl Detector for GradleDetector {
    fn name(&self) -> &'static str {
        "Gradle Dependency Report"
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::Gradle
    }

    fn applicable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        if BUILD_FILES
            .iter()
            .any(|name| environment.directory.join(name).is_file())
        {
            DetectorResult::Passed
        } else {
            DetectorResult::file_not_found("build.gradle")
        }
    }

    fn matched_files(&self, environment: &DetectorEnvironment) -> Vec<String> {
        BUILD_FILES
            .iter()
            .filter(|name| environment.directory.join(name).is_file())
            .map(|name| name.to_string())
            .collect()
    }

    fn extractable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        if self.gradle_program(environment).is_some() {
            DetectorResult::Passed
        } else {
            DetectorResult::executable_not_found("gradle")
        }
    }

    fn extract(&self, environment: &DetectorEnvironment, _id: &ExtractionId) -> Extraction {
        let program = match self.gradle_program(environment) {
            Some(program) => program,
            None => return Extraction::failure("gradle executable disappeared before extraction"),
        };

        let exe = Executable::new(program, &environment.directory)
            .arg("-q")
            .arg("dependencies");

        let output = match self.context.runner.run(&exe) {
            Ok(output) => output,
            Err(e) => return Extraction::failure(e),
        };
        if output.timed_out {
            return Extraction::failure("gradle dependencies timed out");
        }
        if !output.succeeded() {
            return Extraction::failure(format!(
                "gradle dependencies exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            ));
        }

        let (graph, project) = match parse_dependency_report(&output.stdout) {
            Ok(parsed) => parsed,
            Err(e) => return Extraction::failure(e),
        };
        if graph.is_empty() {
            return Extraction::failure("gradle report contained no dependencies");
        }
        match project {
            Some(project) => Extraction::success_with_project(graph, project),
            None => Extraction::success(graph),
        }
    }
}

/// Parse a `gradle dependencies` report.
///
/// Dependency lines carry a tree drawn in five-character blocks:
/// `|    ` / `     ` for continuation, then `+--- ` or `\--- ` before the
/// `group:artifact:version` coordinate. The block count is the tree level.
/// `-> resolved` replaces the declared version; `(*)`/`(c)`/`(n)` markers
/// are suppression flags, with `(n)` entries never resolved.
pub(crate) fn parse_dependency_report(
    report: &str,
) -> Result<(DependencyGraph, Option<ProjectIdentity>), String> {
    let root_re = Regex::new(r"^Root project '([^']+)'").map_err(|e| e.to_string())?;

    let mut graph = DependencyGraph::new();
    let mut project = None;
    let mut stack: Vec<ExternalId> = Vec::new();

    for line in report.lines() {
        if let Some(caps) = root_re.captures(line) {
            if project.is_none() {
                project = Some(ProjectIdentity::named(&caps[1]));
            }
            continue;
        }

        match parse_report_line(line) {
            Some((level, id)) => {
                stack.truncate(level);
                match stack.last() {
                    Some(parent) => {
                        let parent = parent.clone();
                        graph.add_child(&parent, Dependency::new(id.clone()));
                    }
                    None => graph.add_root(Dependency::new(id.clone())),
                }
                stack.push(id);
            }
            None => {
                // Configuration headers and blank lines end the current tree.
                if !line.starts_with(['|', '+', '\\', ' ']) {
                    stack.clear();
                }
            }
        }
    }

    Ok((graph, project))
}

fn parse_report_line(line: &str) -> Option<(usize, ExternalId)> {
    let mut rest = line;
    let mut level = 0;
    while rest.starts_with("|    ") || rest.starts_with("     ") {
        rest = &rest[5..];
        level += 1;
    }

    let component = rest
        .strip_prefix("+--- ")
        .or_else(|| rest.strip_prefix("\\--- "))?;

    let component = component.trim();
    if component.ends_with("(n)") {
        return None;
    }
    let component = component
        .trim_end_matches("(*)")
        .trim_end_matches("(c)")
        .trim();

    let (declared, resolved) = match component.split_once(" -> ") {
        Some((left, right)) => (left.trim(), Some(right.trim())),
        None => (component, None),
    };

    let mut parts = declared.split(':');
    let group = parts.next()?.trim();
    let artifact = parts.next()?.trim();
    let declared_version = parts.next().map(str::trim).filter(|v| !v.is_empty());
    let version = resolved.or(declared_version)?;

    if group.is_empty() || artifact.is_empty() {
        return None;
    }
    Some((level, ExternalId::with_namespace(Forge::Maven, group, artifact, version)))
}

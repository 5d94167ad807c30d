use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::graph::{Dependency, DependencyGraph, ExternalId, Forge};
use crate::models::{DetectorType, ProjectIdentity};

use super::{find_matching, Detector, DetectorEnvironment, DetectorResult, Extraction, ExtractionId};

const PROJECT_PATTERNS: [&str; 2] = ["*.csproj", "*.fsproj"];
const PACKAGES_CONFIG: &str = "packages.config";

/// Detects .NET projects via SDK-style project files (`<PackageReference>`)
/// or legacy `packages.config` (`<package>` entries).
///
/// Neither format carries resolution hierarchy, so every referenced
/// package lands in the root set.
pub struct NugetDetector;

impl NugetDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for NugetDetector {
    fn name(&self) -> &'static str {
        "Nuget Project File"
    }

    fn detector_type(&self) -> DetectorType {
        DetectorType::Nuget
    }

    fn applicable(&self, environment: &DetectorEnvironment) -> DetectorResult {
        if self.matched_files(environment).is_empty() {
            DetectorResult::file_not_found("*.csproj")
        } else {
            DetectorResult::Passed
        }
    }

    fn matched_files(&self, environment: &DetectorEnvironment) -> Vec<String> {
        let dir = &environment.directory;
        let mut matched: Vec<String> = PROJECT_PATTERNS
            .iter()
            .flat_map(|pattern| find_matching(dir, pattern))
            .collect();
        if dir.join(PACKAGES_CONFIG).is_file() {
            matched.push(PACKAGES_CONFIG.to_string());
        }
        matched.sort();
        matched
    }

    fn extract(&self, environment: &DetectorEnvironment, _id: &ExtractionId) -> Extraction {
        let dir = &environment.directory;
        let mut graph = DependencyGraph::new();
        let mut project: Option<ProjectIdentity> = None;

        for pattern in PROJECT_PATTERNS {
            for file_name in find_matching(dir, pattern) {
                let path = dir.join(&file_name);
                match parse_project_file(&path) {
                    Ok((deps, version)) => {
                        for dep in deps {
                            graph.add_root(dep);
                        }
                        if project.is_none() {
                            let stem = Path::new(&file_name)
                                .file_stem()
                                .map(|s| s.to_string_lossy().into_owned())
                                .unwrap_or(file_name.clone());
                            project = Some(ProjectIdentity { name: stem, version });
                        }
                    }
                    Err(e) => return Extraction::failure(format!("{}: {}", file_name, e)),
                }
            }
        }

        let config_path = dir.join(PACKAGES_CONFIG);
        if config_path.is_file() {
            match parse_packages_config(&config_path) {
                Ok(deps) => {
                    for dep in deps {
                        graph.add_root(dep);
                    }
                }
                Err(e) => return Extraction::failure(format!("{}: {}", PACKAGES_CONFIG, e)),
            }
        }

        match project {
            Some(project) => Extraction::success_with_project(graph, project),
            None => Extraction::success(graph),
        }
    }
}

fn nuget_dep(name: &str, version: &str) -> Dependency {
    Dependency::new(ExternalId::name_version(Forge::Nuget, name, version))
}

/// Parse `<PackageReference Include="..." Version="..." />` entries and the
/// project's own `<Version>` element from an SDK-style project file.
fn parse_project_file(path: &Path) -> Result<(Vec<Dependency>, Option<String>), String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut deps = Vec::new();
    let mut project_version = None;
    let mut in_version_element = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if tag == "PackageReference" {
                    let mut name = String::new();
                    let mut version = String::new();
                    for attr in e.attributes().flatten() {
                        let key =
                            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                        let val = attr.unescape_value().unwrap_or_default().into_owned();
                        match key.as_str() {
                            "Include" => name = val,
                            "Version" => version = val,
                            _ => {}
                        }
                    }
                    if !name.is_empty() {
                        deps.push(nuget_dep(&name, &version));
                    }
                } else if tag == "Version" {
                    in_version_element = true;
                }
            }
            Ok(Event::Text(ref t)) if in_version_element => {
                if project_version.is_none() {
                    project_version = Some(t.unescape().unwrap_or_default().into_owned());
                }
                in_version_element = false;
            }
            Ok(Event::End(_)) => in_version_element = false,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((deps, project_version))
}

/// Parse `<package id="..." version="..." />` from `packages.config`.
fn parse_packages_config(path: &Path) -> Result<Vec<Dependency>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut deps = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if tag == "package" {
                    let mut id = String::new();
                    let mut version = String::new();
                    for attr in e.attributes().flatten() {
                        let key =
                            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                        let val = attr.unescape_value().unwrap_or_default().into_owned();
                        match key.as_str() {
                            "id" => id = val,
                            "version" => version = val,
                            _ => {}
                        }
                    }
                    if !id.is_empty() {
                        deps.push(nuget_dep(&id, &version));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csproj() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("App.csproj"),
            r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <Version>3.1.0</Version>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Newtonsoft.Json" Version="13.0.1" />
    <PackageReference Include="Serilog" Version="2.12.0" />
  </ItemGroup>
</Project>"#,
        )
        .unwrap();

        let detector = NugetDetector::new();
        let env = DetectorEnvironment::new(dir.path(), 0, false);
        assert!(detector.applicable(&env).passed());
        assert_eq!(detector.matched_files(&env), vec!["App.csproj".to_string()]);

        let id = ExtractionId { detector_type: DetectorType::Nuget, index: 0 };
        match detector.extract(&env, &id) {
            Extraction::Success { graph, project } => {
                assert_eq!(project, Some(ProjectIdentity::new("App", "3.1.0")));
                assert_eq!(graph.node_count(), 2);
                assert!(graph.is_root(&ExternalId::name_version(
                    Forge::Nuget,
                    "Newtonsoft.Json",
                    "13.0.1"
                )));
            }
            Extraction::Failure { error } => panic!("unexpected failure: {}", error),
        }
    }

    #[test]
    fn test_parse_packages_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PACKAGES_CONFIG);
        std::fs::write(
            &path,
            r#"<?xml version="1.0" encoding="utf-8"?>
<packages>
  <package id="Newtonsoft.Json" version="13.0.1" targetFramework="net452" />
  <package id="NUnit" version="3.13.3" targetFramework="net452" />
</packages>"#,
        )
        .unwrap();

        let deps = parse_packages_config(&path).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "Newtonsoft.Json");
        assert_eq!(deps[1].version, "3.13.3");
    }
}

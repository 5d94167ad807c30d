use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use crate::project::timestamp_version;

/// Root configuration structure, deserialized from `.depscan/config.toml`.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub extraction: ExtractionConfig,
    pub project: ProjectConfig,
    pub status: StatusConfig,
}

/// Tree search settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum traversal depth below the source root.
    pub max_depth: usize,
    /// Directory names treated as vendored/nested and flagged excluded.
    pub excluded_directories: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_depth: 3,
            excluded_directories: [
                "node_modules",
                "bower_components",
                "vendor",
                "venv",
                ".venv",
                "__pycache__",
                ".git",
                ".gradle",
                "target",
                "build",
                "out",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// External process settings for the extraction stage.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Seconds before an external tool invocation is killed and the
    /// extraction recorded as failed.
    pub timeout_seconds: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig { timeout_seconds: 300 }
    }
}

/// Project identity fallback settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// How the fallback version is produced when no candidate or override
    /// supplies one.
    pub version_scheme: VersionScheme,
    /// Fallback version used by the `text` scheme.
    pub version_text: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            version_scheme: VersionScheme::Text,
            version_text: "unversioned".to_string(),
        }
    }
}

impl ProjectConfig {
    pub fn default_version(&self) -> String {
        match self.version_scheme {
            VersionScheme::Text => self.version_text.clone(),
            VersionScheme::Timestamp => timestamp_version(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VersionScheme {
    Text,
    Timestamp,
}

/// Overall run status policy.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Whether any failed detector category degrades the run's exit code.
    pub fail_on_detector_failure: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig { fail_on_detector_failure: true }
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.depscan/config.toml`
/// 3. `~/.config/depscan/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        let content = std::fs::read_to_string(path)?;
        return Ok(toml::from_str(&content)?);
    }

    let project_config = project_path.join(".depscan").join("config.toml");
    if project_config.exists() {
        let content = std::fs::read_to_string(&project_config)?;
        return Ok(toml::from_str(&content)?);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("depscan").join("config.toml");
        if home_config.exists() {
            let content = std::fs::read_to_string(&home_config)?;
            return Ok(toml::from_str(&content)?);
        }
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.max_depth, 3);
        assert!(config
            .search
            .excluded_directories
            .contains(&"node_modules".to_string()));
        assert_eq!(config.extraction.timeout_seconds, 300);
        assert!(config.status.fail_on_detector_failure);
        assert_eq!(config.project.default_version(), "unversioned");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
[search]
max_depth = 7

[project]
version_scheme = "timestamp"

[status]
fail_on_detector_failure = false
"#,
        )
        .unwrap();

        assert_eq!(config.search.max_depth, 7);
        assert_eq!(config.project.version_scheme, VersionScheme::Timestamp);
        assert!(!config.status.fail_on_detector_failure);
        // Untouched sections keep their defaults.
        assert_eq!(config.extraction.timeout_seconds, 300);
    }

    #[test]
    fn test_timestamp_scheme_produces_parseable_version() {
        let config: Config = toml::from_str("[project]\nversion_scheme = \"timestamp\"\n").unwrap();
        let version = config.project.default_version();
        assert!(version.ends_with('Z'));
        assert_eq!(version.len(), "2024-03-01T12:00:00Z".len());
    }

    #[test]
    fn test_load_config_from_project_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".depscan")).unwrap();
        std::fs::write(
            dir.path().join(".depscan").join("config.toml"),
            "[search]\nmax_depth = 9\n",
        )
        .unwrap();

        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.search.max_depth, 9);
    }
}

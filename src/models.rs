use serde::{Deserialize, Serialize};

/// Ecosystem-specific classification of a detector.
///
/// Variant order doubles as the fixed category priority list for project
/// identity decisions: earlier variants win ties at equal traversal depth
/// (see [`crate::project`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorType {
    Cargo,
    GoDeps,
    GoMod,
    Gradle,
    Npm,
    Yarn,
    Nuget,
    Pip,
}

impl DetectorType {
    pub const ALL: [DetectorType; 8] = [
        DetectorType::Cargo,
        DetectorType::GoDeps,
        DetectorType::GoMod,
        DetectorType::Gradle,
        DetectorType::Npm,
        DetectorType::Yarn,
        DetectorType::Nuget,
        DetectorType::Pip,
    ];

    /// Position in the category priority list; lower wins.
    pub fn priority(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(usize::MAX)
    }
}

impl std::fmt::Display for DetectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorType::Cargo => write!(f, "cargo"),
            DetectorType::GoDeps => write!(f, "go-deps"),
            DetectorType::GoMod => write!(f, "go-mod"),
            DetectorType::Gradle => write!(f, "gradle"),
            DetectorType::Npm => write!(f, "npm"),
            DetectorType::Yarn => write!(f, "yarn"),
            DetectorType::Nuget => write!(f, "nuget"),
            DetectorType::Pip => write!(f, "pip"),
        }
    }
}

/// A project name/version pair, either detector-reported or decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameVersion {
    pub name: String,
    pub version: String,
}

impl NameVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        NameVersion {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for NameVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Detector-reported project identity. The version may be absent (a
/// manifest can declare a name without a version); the decider fills in
/// the configured default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIdentity {
    pub name: String,
    pub version: Option<String>,
}

impl ProjectIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        ProjectIdentity { name: name.into(), version: None }
    }

    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        ProjectIdentity {
            name: name.into(),
            version: Some(version.into()),
        }
    }
}

/// Tri-state outcome reported per detector category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusType {
    Success,
    Failure,
    NotRun,
}

impl std::fmt::Display for StatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusType::Success => write!(f, "success"),
            StatusType::Failure => write!(f, "failure"),
            StatusType::NotRun => write!(f, "not run"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_follows_registration_order() {
        assert!(DetectorType::Cargo.priority() < DetectorType::Npm.priority());
        assert!(DetectorType::GoDeps.priority() < DetectorType::GoMod.priority());
        assert!(DetectorType::Npm.priority() < DetectorType::Yarn.priority());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(DetectorType::GoMod.to_string(), "go-mod");
        assert_eq!(DetectorType::Npm.to_string(), "npm");
        assert_eq!(NameVersion::new("app", "1.0").to_string(), "app@1.0");
    }
}

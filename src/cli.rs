use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::models::DetectorType;

#[derive(Parser, Debug)]
#[command(name = "depscan")]
#[command(author, version, about = "Inventory package-manager dependencies in a source tree")]
pub struct Cli {
    /// Source directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Path to an alternative configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum directory depth to search below the source root
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Run only the named detector
    #[arg(long, value_enum)]
    pub detector: Option<DetectorTypeArg>,

    /// Skip the named detector (repeatable)
    #[arg(long = "exclude-detector", value_enum)]
    pub exclude_detectors: Vec<DetectorTypeArg>,

    /// Merge all dependency graphs into a single artifact with this name
    #[arg(long, value_name = "NAME")]
    pub aggregate: Option<String>,

    /// Override the decided project name
    #[arg(long)]
    pub project_name: Option<String>,

    /// Override the decided project version
    #[arg(long)]
    pub project_version: Option<String>,

    /// Prefer this detector category when deciding the project identity
    #[arg(long, value_enum)]
    pub preferred_detector: Option<DetectorTypeArg>,

    /// Seconds before an external tool invocation is killed
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Write one JSON graph artifact per code location into this directory
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Terminal)]
    pub report: ReportFormat,

    /// Show per-directory detector evaluations, including non-applicable ones
    #[arg(short, long)]
    pub verbose: bool,

    /// Print only the final summary line
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Terminal,
    Json,
}

/// Command-line spelling of the detector categories.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorTypeArg {
    Cargo,
    GoDeps,
    GoMod,
    Gradle,
    Npm,
    Yarn,
    Nuget,
    Pip,
}

impl From<DetectorTypeArg> for DetectorType {
    fn from(arg: DetectorTypeArg) -> Self {
        match arg {
            DetectorTypeArg::Cargo => DetectorType::Cargo,
            DetectorTypeArg::GoDeps => DetectorType::GoDeps,
            DetectorTypeArg::GoMod => DetectorType::GoMod,
            DetectorTypeArg::Gradle => DetectorType::Gradle,
            DetectorTypeArg::Npm => DetectorType::Npm,
            DetectorTypeArg::Yarn => DetectorType::Yarn,
            DetectorTypeArg::Nuget => DetectorType::Nuget,
            DetectorTypeArg::Pip => DetectorType::Pip,
        }
    }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::graph::DependencyGraph;
use crate::models::DetectorType;

/// One dependency graph tied to its provenance: the detector category that
/// produced it and the source path it was found under. Never mutated after
/// creation; consumed once by [`process`].
#[derive(Debug, Clone)]
pub struct DetectCodeLocation {
    pub detector_type: DetectorType,
    pub source_path: PathBuf,
    pub graph: DependencyGraph,
}

/// A code location with its decided unique display name.
#[derive(Debug, Clone)]
pub struct NamedCodeLocation {
    pub name: String,
    pub source_path: PathBuf,
    pub detector_types: BTreeSet<DetectorType>,
    pub graph: DependencyGraph,
}

/// Outcome of aggregation: the named output artifacts plus which detector
/// categories contributed and which had failed, for status reporting.
#[derive(Debug, Clone)]
pub struct CodeLocationResult {
    pub locations: Vec<NamedCodeLocation>,
    pub successful: BTreeSet<DetectorType>,
    pub failed: BTreeSet<DetectorType>,
}

/// Deduplicate and name detector outputs.
///
/// Locations sharing (detector category, source path) are the same scan
/// result and merge into one group. Each group is named
/// `<sourcePathFinalSegment>/<detectorCategory>`, with a numeric suffix on
/// collision so names are unique across the whole run. In aggregate mode
/// every graph merges into exactly one artifact named `aggregate_name`.
pub fn process(
    code_locations: Vec<DetectCodeLocation>,
    failed: BTreeSet<DetectorType>,
    aggregate_name: Option<&str>,
    source_root: &Path,
) -> CodeLocationResult {
    let successful: BTreeSet<DetectorType> =
        code_locations.iter().map(|l| l.detector_type).collect();

    if let Some(name) = aggregate_name {
        // Nothing extracted means nothing to aggregate; an empty artifact
        // would still be written under the aggregate name otherwise.
        if code_locations.is_empty() {
            return CodeLocationResult {
                locations: Vec::new(),
                successful,
                failed,
            };
        }
        let mut graph = DependencyGraph::new();
        let mut detector_types = BTreeSet::new();
        for location in &code_locations {
            graph.merge(&location.graph);
            detector_types.insert(location.detector_type);
        }
        return CodeLocationResult {
            locations: vec![NamedCodeLocation {
                name: name.to_string(),
                source_path: source_root.to_path_buf(),
                detector_types,
                graph,
            }],
            successful,
            failed,
        };
    }

    // Group by the minimal identity key; BTreeMap ordering keeps naming
    // deterministic across runs.
    let mut groups: BTreeMap<(PathBuf, DetectorType), DependencyGraph> = BTreeMap::new();
    for location in code_locations {
        groups
            .entry((location.source_path.clone(), location.detector_type))
            .and_modify(|graph| graph.merge(&location.graph))
            .or_insert(location.graph);
    }

    let mut used_names: HashMap<String, usize> = HashMap::new();
    let mut locations = Vec::new();
    for ((source_path, detector_type), graph) in groups {
        let base = format!("{}/{}", final_segment(&source_path), detector_type);
        let name = match used_names.get_mut(&base) {
            Some(count) => {
                *count += 1;
                format!("{} {}", base, count)
            }
            None => {
                used_names.insert(base.clone(), 1);
                base
            }
        };
        locations.push(NamedCodeLocation {
            name,
            source_path,
            detector_types: BTreeSet::from([detector_type]),
            graph,
        });
    }

    CodeLocationResult { locations, successful, failed }
}

fn final_segment(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

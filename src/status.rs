use std::collections::{BTreeMap, BTreeSet};

use crate::models::{DetectorType, StatusType};

/// Per-category tri-state outcome map, built once after aggregation and
/// handed to reporting and exit-code selection.
///
/// A category that both succeeded somewhere and failed somewhere reports
/// failure; partial success must not mask a broken extraction.
#[derive(Debug, Clone)]
pub struct DetectorStatus {
    statuses: BTreeMap<DetectorType, StatusType>,
}

impl DetectorStatus {
    pub fn from_outcomes(
        successful: &BTreeSet<DetectorType>,
        failed: &BTreeSet<DetectorType>,
    ) -> Self {
        let statuses = DetectorType::ALL
            .iter()
            .map(|&detector_type| {
                let status = if failed.contains(&detector_type) {
                    StatusType::Failure
                } else if successful.contains(&detector_type) {
                    StatusType::Success
                } else {
                    StatusType::NotRun
                };
                (detector_type, status)
            })
            .collect();
        DetectorStatus { statuses }
    }

    pub fn of(&self, detector_type: DetectorType) -> StatusType {
        self.statuses
            .get(&detector_type)
            .copied()
            .unwrap_or(StatusType::NotRun)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DetectorType, StatusType)> + '_ {
        self.statuses.iter().map(|(&t, &s)| (t, s))
    }

    pub fn any_failure(&self) -> bool {
        self.statuses.values().any(|&s| s == StatusType::Failure)
    }

    /// Apply the configured policy: when `fail_on_detector_failure` is set,
    /// any failed category degrades the overall run.
    pub fn overall_success(&self, fail_on_detector_failure: bool) -> bool {
        !(fail_on_detector_failure && self.any_failure())
    }
}

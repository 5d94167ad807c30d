use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::TempDir;

pub const PIP_INSPECTOR_NAME: &str = "pip-inspector.py";

const PIP_INSPECTOR_SOURCE: &str = include_str!("../resources/pip-inspector.py");

/// Provisions bundled inspector scripts into a scratch directory outside
/// the scanned source tree.
///
/// Scripts are written once per run; the scratch directory lives as long as
/// the manager and is cleaned up on drop.
#[derive(Default)]
pub struct InspectorManager {
    state: Mutex<ScratchState>,
}

#[derive(Default)]
struct ScratchState {
    scratch: Option<TempDir>,
    pip_inspector: Option<PathBuf>,
}

impl InspectorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate (provisioning on first call) the pip inspector script.
    pub fn pip_inspector(&self) -> Result<PathBuf, String> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| "inspector scratch lock poisoned".to_string())?;

        if let Some(path) = &state.pip_inspector {
            return Ok(path.clone());
        }

        if state.scratch.is_none() {
            let dir = tempfile::Builder::new()
                .prefix("depscan-inspectors")
                .tempdir()
                .map_err(|e| format!("failed to create inspector scratch dir: {}", e))?;
            state.scratch = Some(dir);
        }

        let path = state
            .scratch
            .as_ref()
            .map(|dir| dir.path().join(PIP_INSPECTOR_NAME))
            .ok_or_else(|| "inspector scratch dir missing".to_string())?;
        std::fs::write(&path, PIP_INSPECTOR_SOURCE)
            .map_err(|e| format!("failed to write {}: {}", PIP_INSPECTOR_NAME, e))?;

        state.pip_inspector = Some(path.clone());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisions_once_and_reuses() {
        let manager = InspectorManager::new();
        let first = manager.pip_inspector().unwrap();
        let second = manager.pip_inspector().unwrap();
        assert_eq!(first, second);
        assert!(first.is_file());
        let content = std::fs::read_to_string(&first).unwrap();
        assert!(content.contains("importlib"));
    }
}

//! Lazily created, process-wide ONNX sessions.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use ndarray::{Array4, CowArray};
use once_cell::sync::OnceCell;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use wardrobe_common::{Result, VisionError};

/// Loads the model on first use. Concurrent first callers block on the same
/// initialization instead of loading twice; a failed load is retried next time.
pub struct LazySession {
    path: PathBuf,
    cell: OnceCell<Mutex<Session>>,
}

impl LazySession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Exclusive access to the loaded session, loading it if needed.
    pub fn lock(&self) -> Result<MutexGuard<'_, Session>> {
        let session = self
            .cell
            .get_or_try_init(|| load_session(&self.path).map(Mutex::new))?;
        session
            .lock()
            .map_err(|_| VisionError::model_unavailable("session poisoned by an earlier panic"))
    }

    /// Runs the model on a single NCHW input and copies out the first output as
    /// `(shape, values)`.
    pub fn run(&self, input: Array4<f32>) -> Result<(Vec<i64>, Vec<f32>)> {
        let mut session = self.lock()?;
        let input_dyn = CowArray::from(input).into_dyn();

        let tensor = TensorRef::from_array_view(&input_dyn).map_err(VisionError::model_unavailable)?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| VisionError::ModelUnavailable(format!("inference failed: {e}")))?;

        let (shape, values) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(VisionError::invalid_output)?;
        Ok((shape.to_vec(), values.to_vec()))
    }
}

fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Err(VisionError::ModelUnavailable(format!(
            "model file {path:?} does not exist"
        )));
    }
    log::info!("Loading ONNX model from {:?}", path);
    let build = || -> anyhow::Result<Session> {
        Ok(Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(path)?)
    };
    let session = build().map_err(|e| VisionError::ModelUnavailable(format!("{path:?}: {e:#}")))?;
    log::debug!("{session:?}");
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_unavailable_and_retried() {
        let session = LazySession::new("_models/does-not-exist.onnx");
        assert!(matches!(session.lock(), Err(VisionError::ModelUnavailable(_))));
        assert!(!session.is_loaded());
        assert!(matches!(session.lock(), Err(VisionError::ModelUnavailable(_))));
    }
}

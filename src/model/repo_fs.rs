//! Filesystem repository for the persisted forest state.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::common::config::AppCfg;
use crate::common::error::{MaintError, MaintResult};

use super::domain::ForestModel;

/// Repository contract for model state.
pub trait ModelRepo {
    fn load_model(&self) -> MaintResult<ForestModel>;
    /// Export a trained forest in the format `load_model` reads. The service
    /// never writes models; this is the hook for the offline training job
    /// and for test fixtures.
    fn put_model(&self, model: &ForestModel) -> MaintResult<()>;
}

/// Model state stored as JSON at a fixed path.
pub struct FsModelRepo {
    path: PathBuf,
}

impl FsModelRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(cfg.model_path.clone())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_dirs(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }
}

impl ModelRepo for FsModelRepo {
    /// Load the persisted model, or fall back to an untrained one when the
    /// file does not exist. A file that exists but does not decode is fatal.
    fn load_model(&self) -> MaintResult<ForestModel> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(
                    ev = "model_degraded",
                    path = %self.path.display(),
                    "pre-trained model not found, serving predictions from an untrained model"
                );
                return Ok(ForestModel::untrained());
            }
            Err(err) => return Err(MaintError::io("read model state", err)),
        };

        let model: ForestModel = serde_json::from_slice(&raw)
            .map_err(|err| MaintError::model(format!("decode model state: {err}")))?;
        model.validate()?;

        info!(
            ev = "model_loaded",
            path = %self.path.display(),
            trees = model.trees.len(),
            n_features = model.n_features,
            version = model.version.as_deref().unwrap_or("unversioned"),
        );
        Ok(model)
    }

    fn put_model(&self, model: &ForestModel) -> MaintResult<()> {
        model.validate()?;
        self.ensure_dirs()
            .map_err(|err| MaintError::io("create model dir", err))?;
        let body = serde_json::to_vec_pretty(model)
            .map_err(|err| MaintError::internal(format!("encode model state: {err}")))?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|err| MaintError::io("open model state", err))?;
        file.write_all(&body)
            .map_err(|err| MaintError::io("write model state", err))?;
        Ok(())
    }
}

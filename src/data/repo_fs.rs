//! Filesystem-backed feature store.
//!
//! The backing document maps equipment ids to numeric arrays:
//! `{"EQUIP-001": [412.0, 0.37, 71.5, 3.0]}`. It is re-read on every fetch so
//! updates made by the upstream exporter are visible without a restart.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::common::config::AppCfg;
use crate::common::error::{MaintError, MaintResult};

use super::domain::{EquipmentId, FeatureStore, FeatureVector};

/// Feature store reading a JSON document from disk.
pub struct JsonFeatureStore {
    path: PathBuf,
}

impl JsonFeatureStore {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(cfg.features_path.clone())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    // Rows stay undecoded so a bad row only affects lookups of that id.
    async fn read_document(&self) -> MaintResult<HashMap<String, serde_json::Value>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(MaintError::transient(format!(
                    "feature store {} is missing",
                    self.path.display()
                )))
            }
            Err(err) => return Err(MaintError::io("read feature store", err)),
        };
        serde_json::from_slice(&raw)
            .map_err(|err| MaintError::transient(format!("decode feature store: {err}")))
    }
}

#[async_trait]
impl FeatureStore for JsonFeatureStore {
    async fn fetch(&self, id: &EquipmentId) -> MaintResult<FeatureVector> {
        let mut document = self.read_document().await?;
        let row = match document.remove(id.as_str()) {
            Some(serde_json::Value::Null) | None => {
                return Err(MaintError::not_found("equipment data"))
            }
            Some(row) => row,
        };
        let values: Vec<f64> = serde_json::from_value(row).map_err(|err| {
            MaintError::transient(format!("decode features for {id}: {err}"))
        })?;
        if values.is_empty() {
            return Err(MaintError::not_found("equipment data"));
        }
        debug!(ev = "features_loaded", equipment_id = %id, n = values.len());
        Ok(FeatureVector::new(values))
    }
}

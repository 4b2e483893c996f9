//! In-memory feature store for tests and local demos.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::common::error::{MaintError, MaintResult};

use super::domain::{EquipmentId, FeatureStore, FeatureVector};

#[derive(Default)]
pub struct MemoryFeatureStore {
    rows: RwLock<HashMap<String, FeatureVector>>,
}

impl MemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the features for an asset.
    pub fn insert(&self, id: impl Into<String>, features: impl Into<FeatureVector>) {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        rows.insert(id.into(), features.into());
    }

    pub fn with(self, id: impl Into<String>, features: impl Into<FeatureVector>) -> Self {
        self.insert(id, features);
        self
    }
}

#[async_trait]
impl FeatureStore for MemoryFeatureStore {
    async fn fetch(&self, id: &EquipmentId) -> MaintResult<FeatureVector> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        rows.get(id.as_str())
            .filter(|features| !features.is_empty())
            .cloned()
            .ok_or_else(|| MaintError::not_found("equipment data"))
    }
}

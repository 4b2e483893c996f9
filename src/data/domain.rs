//! Equipment identifiers, feature vectors and the feature store contract.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::error::{MaintError, MaintResult};

/// Opaque identifier of a monitored asset. Never empty.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct EquipmentId(String);

impl EquipmentId {
    /// Validate and wrap a caller-supplied identifier.
    pub fn parse<S: Into<String>>(value: S) -> MaintResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(MaintError::invalid("equipment_id is required"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric descriptors of one asset's operating state at query time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Read-only lookup of the current feature vector for an asset.
///
/// Implementations return `NotFound` when no record exists and `TransientIo`
/// for any failure reaching the backing store.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn fetch(&self, id: &EquipmentId) -> MaintResult<FeatureVector>;
}

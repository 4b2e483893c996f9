//! Prediction values produced by the model and served by the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::domain::EquipmentId;

/// Maintenance estimate for one asset. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Serialised as `YYYY-MM-DD`.
    pub next_maintenance_date: NaiveDate,
    /// Urgency on a 0-100 scale, higher is more urgent.
    pub risk_score: f64,
}

/// Body returned by `GET /predict`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub equipment_id: String,
    pub next_maintenance_date: NaiveDate,
    pub risk_score: f64,
}

impl PredictionResponse {
    pub fn new(id: &EquipmentId, prediction: &Prediction) -> Self {
        Self {
            equipment_id: id.as_str().to_string(),
            next_maintenance_date: prediction.next_maintenance_date,
            risk_score: prediction.risk_score,
        }
    }
}

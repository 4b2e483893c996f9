//! Append-only record of served predictions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::common::error::MaintResult;
use crate::data::domain::EquipmentId;
use crate::inference::domain::Prediction;

/// Column order of every history sink.
pub const HISTORY_COLUMNS: [&str; 4] = [
    "equipment_id",
    "timestamp",
    "next_maintenance_date",
    "risk_score",
];

/// One served prediction. Never mutated or deleted once written.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryRecord {
    pub equipment_id: EquipmentId,
    pub timestamp: DateTime<Utc>,
    pub next_maintenance_date: NaiveDate,
    pub risk_score: f64,
}

impl HistoryRecord {
    pub fn new(id: &EquipmentId, prediction: &Prediction, timestamp: DateTime<Utc>) -> Self {
        Self {
            equipment_id: id.clone(),
            timestamp,
            next_maintenance_date: prediction.next_maintenance_date,
            risk_score: prediction.risk_score,
        }
    }

    /// Field values in [`HISTORY_COLUMNS`] order.
    pub fn fields(&self) -> [String; 4] {
        [
            self.equipment_id.as_str().to_string(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.next_maintenance_date.format("%Y-%m-%d").to_string(),
            self.risk_score.to_string(),
        ]
    }
}

/// Durable destination for history records. Appends must be safe under
/// concurrent callers.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn append(&self, record: &HistoryRecord) -> MaintResult<()>;
}

//! History domain: durable log of every served prediction.

pub mod domain;
pub mod repo_fs;

use std::sync::Arc;

use tracing::warn;

use crate::common::time;
use crate::data::domain::EquipmentId;
use crate::inference::domain::Prediction;

pub use domain::{HistoryRecord, HistorySink, HISTORY_COLUMNS};
pub use repo_fs::CsvHistory;

/// Best-effort front for a [`HistorySink`]: stamps records and never fails.
#[derive(Clone)]
pub struct HistoryRecorder {
    sink: Arc<dyn HistorySink>,
}

impl HistoryRecorder {
    pub fn new(sink: Arc<dyn HistorySink>) -> Self {
        Self { sink }
    }

    /// Append one record. Failures are logged and dropped, never retried.
    pub async fn record(&self, id: &EquipmentId, prediction: &Prediction) {
        let record = HistoryRecord::new(id, prediction, time::now_utc());
        if let Err(err) = self.sink.append(&record).await {
            warn!(
                ev = "history_append_failed",
                code = err.code as u32,
                equipment_id = %id,
                error = %err,
            );
        }
    }
}

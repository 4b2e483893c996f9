//! Alert messages and the transport seam.

use async_trait::async_trait;
use serde::Serialize;

use crate::common::error::MaintResult;
use crate::data::domain::EquipmentId;
use crate::inference::domain::Prediction;

/// A message ready to hand to a transport.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlertMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    /// Notification for a caller who asked to be told about a prediction.
    pub fn prediction(recipient: &str, id: &EquipmentId, prediction: &Prediction) -> Self {
        Self {
            to: recipient.to_string(),
            subject: format!("Maintenance prediction for {id}"),
            body: format!(
                "Equipment {id} is due for maintenance on {} (risk score {:.2}).",
                prediction.next_maintenance_date.format("%Y-%m-%d"),
                prediction.risk_score
            ),
        }
    }

    /// Operations notification for a prediction above the risk threshold.
    pub fn high_risk(
        recipient: &str,
        id: &EquipmentId,
        prediction: &Prediction,
        threshold: f64,
    ) -> Self {
        Self {
            to: recipient.to_string(),
            subject: format!("High maintenance risk: {id}"),
            body: format!(
                "Equipment {id} scored {:.2} (threshold {threshold:.2}); maintenance due {}.",
                prediction.risk_score,
                prediction.next_maintenance_date.format("%Y-%m-%d"),
            ),
        }
    }
}

/// External channel that delivers alert messages.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &AlertMessage) -> MaintResult<()>;
}

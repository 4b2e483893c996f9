//! Alert domain: advisory notifications about served predictions.
//!
//! Nothing here is on the critical path. Every send is bounded by a timeout
//! and every failure ends in a log line.

pub mod domain;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::common::config::AppCfg;
use crate::common::error::MaintError;
use crate::common::time;
use crate::data::domain::EquipmentId;
use crate::inference::domain::Prediction;

pub use domain::{AlertMessage, AlertTransport};
pub use transport::{LogTransport, MailRelay};

#[derive(Clone)]
pub struct AlertDispatcher {
    transport: Arc<dyn AlertTransport>,
    timeout: Duration,
    high_risk_threshold: f64,
    ops_recipient: Option<String>,
}

impl AlertDispatcher {
    pub fn new(transport: Arc<dyn AlertTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            high_risk_threshold: 80.0,
            ops_recipient: None,
        }
    }

    /// Dispatcher wired from config: mail relay when configured, log otherwise.
    pub fn from_cfg(cfg: &AppCfg) -> Self {
        let transport: Arc<dyn AlertTransport> = match MailRelay::from_cfg(&cfg.mail) {
            Some(relay) => Arc::new(relay),
            None => Arc::new(LogTransport),
        };
        let mut dispatcher = Self::new(transport, cfg.alert_timeout)
            .with_high_risk_threshold(cfg.high_risk_threshold);
        if let Some(ops) = &cfg.ops_recipient {
            dispatcher = dispatcher.with_ops_recipient(ops.clone());
        }
        dispatcher
    }

    pub fn with_high_risk_threshold(mut self, threshold: f64) -> Self {
        self.high_risk_threshold = threshold;
        self
    }

    pub fn with_ops_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.ops_recipient = Some(recipient.into());
        self
    }

    pub fn high_risk_threshold(&self) -> f64 {
        self.high_risk_threshold
    }

    /// Tell `recipient` about a served prediction.
    pub async fn notify(&self, id: &EquipmentId, prediction: &Prediction, recipient: &str) {
        let message = AlertMessage::prediction(recipient, id, prediction);
        self.deliver(id, &message, "alert").await;
    }

    /// System-level notification when the score is above the threshold.
    ///
    /// Always logs; also sends to the operations recipient when one is set.
    /// Returns whether the prediction counted as high risk.
    pub async fn notify_high_risk(&self, id: &EquipmentId, prediction: &Prediction) -> bool {
        if prediction.risk_score <= self.high_risk_threshold {
            return false;
        }
        warn!(
            ev = "high_risk",
            equipment_id = %id,
            risk_score = prediction.risk_score,
            threshold = self.high_risk_threshold,
            next_maintenance_date = %prediction.next_maintenance_date,
        );
        if let Some(ops) = &self.ops_recipient {
            let message = AlertMessage::high_risk(ops, id, prediction, self.high_risk_threshold);
            self.deliver(id, &message, "system_alert").await;
        }
        true
    }

    async fn deliver(&self, id: &EquipmentId, message: &AlertMessage, kind: &'static str) {
        let start = time::now_ms();
        let outcome = tokio::time::timeout(self.timeout, self.transport.send(message))
            .await
            .unwrap_or_else(|_| {
                Err(MaintError::transient(format!(
                    "{} timed out after {:?}",
                    self.transport.name(),
                    self.timeout
                )))
            });
        let dur_ms = time::now_ms().saturating_sub(start);

        match outcome {
            Ok(()) => info!(
                ev = "alert_sent",
                kind,
                transport = self.transport.name(),
                equipment_id = %id,
                dur_ms = dur_ms as u64,
            ),
            Err(err) => warn!(
                ev = "alert_failed",
                kind,
                code = err.code as u32,
                transport = self.transport.name(),
                equipment_id = %id,
                dur_ms = dur_ms as u64,
                error = %err,
            ),
        }
    }
}

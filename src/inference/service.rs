//! Request pipeline: validate, look up or compute, record, alert, respond.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::alerts::AlertDispatcher;
use crate::common::config::AppCfg;
use crate::common::error::{ErrorCode, MaintError, MaintResult};
use crate::common::time;
use crate::data::domain::{EquipmentId, FeatureStore};
use crate::data::repo_fs::JsonFeatureStore;
use crate::history::{CsvHistory, HistoryRecorder, HistorySink};
use crate::model::domain::ForestModel;
use crate::model::repo_fs::{FsModelRepo, ModelRepo};
use crate::model::service as model_service;

use super::cache::{PredictionCache, Served};
use super::domain::{Prediction, PredictionResponse};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Orchestrates one maintenance prediction per call.
///
/// Only a missing feature row, invalid input, or a fetch/model failure is
/// reported to the caller. History and alert failures are logged and dropped.
pub struct MaintenanceService {
    features: Arc<dyn FeatureStore>,
    model: Arc<ForestModel>,
    cache: PredictionCache,
    history: HistoryRecorder,
    alerts: AlertDispatcher,
    fetch_timeout: Duration,
}

impl MaintenanceService {
    pub fn new(
        features: Arc<dyn FeatureStore>,
        model: Arc<ForestModel>,
        history: Arc<dyn HistorySink>,
        alerts: AlertDispatcher,
        cache_capacity: usize,
    ) -> Self {
        Self {
            features,
            model,
            cache: PredictionCache::new(cache_capacity),
            history: HistoryRecorder::new(history),
            alerts,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Wire the production collaborators. Loads the model once.
    pub fn from_cfg(cfg: &AppCfg) -> MaintResult<Self> {
        let model = FsModelRepo::new(cfg).load_model()?;
        Ok(Self::new(
            Arc::new(JsonFeatureStore::new(cfg)),
            Arc::new(model),
            Arc::new(CsvHistory::new(cfg)),
            AlertDispatcher::from_cfg(cfg),
            cfg.cache_capacity,
        )
        .with_fetch_timeout(cfg.fetch_timeout))
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &PredictionCache {
        &self.cache
    }

    /// Serve a prediction for `equipment_id`, alerting `alert_recipient` if given.
    pub async fn predict(
        &self,
        equipment_id: &str,
        alert_recipient: Option<&str>,
    ) -> MaintResult<PredictionResponse> {
        let start = time::now_ms();
        let id = EquipmentId::parse(equipment_id)?;
        info!(ev = "predict_received", equipment_id = %id);

        let outcome = self.cache.lookup(&id, || self.compute(&id)).await;

        let Served { prediction, cached } = match outcome {
            Ok(served) => served,
            Err(err) => {
                log_failure(&id, &err);
                return Err(err);
            }
        };

        self.history.record(&id, &prediction).await;

        if let Some(recipient) = alert_recipient.filter(|r| !r.trim().is_empty()) {
            self.alerts.notify(&id, &prediction, recipient).await;
        }
        self.alerts.notify_high_risk(&id, &prediction).await;

        info!(
            ev = "predict_served",
            equipment_id = %id,
            cache_hit = cached,
            risk_score = prediction.risk_score,
            next_maintenance_date = %prediction.next_maintenance_date,
            dur_ms = time::now_ms().saturating_sub(start) as u64,
        );
        Ok(PredictionResponse::new(&id, &prediction))
    }

    async fn compute(&self, id: &EquipmentId) -> MaintResult<Prediction> {
        let features = tokio::time::timeout(self.fetch_timeout, self.features.fetch(id))
            .await
            .map_err(|_| {
                MaintError::transient(format!("feature fetch timed out after {:?}", self.fetch_timeout))
            })??;
        model_service::predict(&self.model, &features, time::today())
    }
}

fn log_failure(id: &EquipmentId, err: &MaintError) {
    match err.code {
        ErrorCode::NotFound => warn!(
            ev = "predict_not_found",
            code = err.code as u32,
            equipment_id = %id,
        ),
        ErrorCode::TransientIo => warn!(
            ev = "predict_unavailable",
            code = err.code as u32,
            equipment_id = %id,
            error = %err,
        ),
        _ => error!(
            ev = "predict_failed",
            code = err.code as u32,
            equipment_id = %id,
            error = %err,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertMessage, AlertTransport};
    use crate::data::domain::FeatureVector;
    use crate::data::repo_mem::MemoryFeatureStore;
    use crate::history::HistoryRecord;
    use crate::model::domain::{RegressionTree, TreeNode};
    use async_trait::async_trait;
    use chrono::Days;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemHistory {
        rows: Mutex<Vec<HistoryRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl HistorySink for MemHistory {
        async fn append(&self, record: &HistoryRecord) -> MaintResult<()> {
            if self.fail {
                return Err(MaintError::transient("disk full"));
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
        recipients: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AlertTransport for CountingTransport {
        fn name(&self) -> &str {
            "counting"
        }

        async fn send(&self, message: &AlertMessage) -> MaintResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.recipients.lock().unwrap().push(message.to.clone());
            Ok(())
        }
    }

    struct CountingStore {
        inner: MemoryFeatureStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeatureStore for CountingStore {
        async fn fetch(&self, id: &EquipmentId) -> MaintResult<FeatureVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(id).await
        }
    }

    /// Feature 0 is hours since last service: <= 100 means 9 days left,
    /// <= 300 means 2, anything longer 1.
    fn model() -> Arc<ForestModel> {
        let tree = RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 100.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: 9.0 },
                TreeNode::Split {
                    feature: 0,
                    threshold: 300.0,
                    left: 3,
                    right: 4,
                },
                TreeNode::Leaf { value: 2.0 },
                TreeNode::Leaf { value: 1.0 },
            ],
        };
        Arc::new(ForestModel::new(2, vec![tree]).unwrap())
    }

    struct Fixture {
        service: MaintenanceService,
        store: Arc<CountingStore>,
        history: Arc<MemHistory>,
        transport: Arc<CountingTransport>,
    }

    fn fixture(history_fails: bool) -> Fixture {
        fixture_with(history_fails, |dispatcher| dispatcher)
    }

    fn fixture_with(
        history_fails: bool,
        alerts: impl FnOnce(AlertDispatcher) -> AlertDispatcher,
    ) -> Fixture {
        let store = Arc::new(CountingStore {
            inner: MemoryFeatureStore::new()
                .with("PUMP-7", vec![50.0, 1.0])
                .with("PUMP-9", vec![200.0, 1.0])
                .with("PUMP-12", vec![400.0, 1.0]),
            calls: AtomicUsize::new(0),
        });
        let history = Arc::new(MemHistory {
            fail: history_fails,
            ..Default::default()
        });
        let transport = Arc::new(CountingTransport::default());
        let service = MaintenanceService::new(
            store.clone(),
            model(),
            history.clone(),
            alerts(AlertDispatcher::new(transport.clone(), Duration::from_secs(1))),
            2,
        );
        Fixture {
            service,
            store,
            history,
            transport,
        }
    }

    #[tokio::test]
    async fn serves_and_records() {
        let fx = fixture(false);
        let resp = fx.service.predict("PUMP-7", None).await.unwrap();

        assert_eq!(resp.equipment_id, "PUMP-7");
        assert_eq!(resp.risk_score, 10.0);
        assert_eq!(
            resp.next_maintenance_date,
            time::today().checked_add_days(Days::new(9)).unwrap()
        );

        let rows = fx.history.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].equipment_id.as_str(), "PUMP-7");
        assert_eq!(rows[0].risk_score, resp.risk_score);
        assert_eq!(fx.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cache_hit_skips_the_store_but_still_records() {
        let fx = fixture(false);
        let first = fx.service.predict("PUMP-7", None).await.unwrap();
        let second = fx.service.predict("PUMP-7", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fx.store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.history.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cached_value_ignores_changed_features() {
        let fx = fixture(false);
        let before = fx.service.predict("PUMP-7", None).await.unwrap();
        fx.store.inner.insert("PUMP-7", vec![900.0, 1.0]);
        let after = fx.service.predict("PUMP-7", None).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn not_found_skips_history_and_alerts() {
        let fx = fixture(false);
        let err = fx
            .service
            .predict("MISSING-1", Some("tech@plant.local"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(fx.history.rows.lock().unwrap().is_empty());
        assert_eq!(fx.transport.calls.load(Ordering::SeqCst), 0);
        assert!(fx.service.cache().is_empty());
    }

    #[tokio::test]
    async fn blank_id_is_invalid() {
        let fx = fixture(false);
        let err = fx.service.predict("  ", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(fx.store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recipient_gets_one_alert() {
        let fx = fixture(false);
        fx.service
            .predict("PUMP-7", Some("tech@plant.local"))
            .await
            .unwrap();
        assert_eq!(fx.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ops_recipient_hears_only_about_scores_above_threshold() {
        let fx = fixture_with(false, |d| {
            d.with_high_risk_threshold(80.0)
                .with_ops_recipient("ops@plant.local")
        });

        // Risk 10, then exactly 80: neither is above the threshold.
        fx.service.predict("PUMP-7", None).await.unwrap();
        let at_threshold = fx.service.predict("PUMP-9", None).await.unwrap();
        assert_eq!(at_threshold.risk_score, 80.0);
        assert_eq!(fx.transport.calls.load(Ordering::SeqCst), 0);

        let high = fx.service.predict("PUMP-12", None).await.unwrap();
        assert_eq!(high.risk_score, 90.0);
        assert_eq!(fx.transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *fx.transport.recipients.lock().unwrap(),
            vec!["ops@plant.local".to_string()]
        );
    }

    #[tokio::test]
    async fn history_failure_does_not_fail_the_request() {
        let fx = fixture(true);
        let resp = fx.service.predict("PUMP-9", None).await.unwrap();
        assert_eq!(resp.risk_score, 80.0);
    }

    #[tokio::test]
    async fn shape_mismatch_surfaces_as_model_error() {
        let fx = fixture(false);
        fx.store.inner.insert("ODD-1", vec![1.0, 2.0, 3.0]);
        let err = fx.service.predict("ODD-1", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ModelError);
    }

    struct StalledStore;

    #[async_trait]
    impl FeatureStore for StalledStore {
        async fn fetch(&self, _: &EquipmentId) -> MaintResult<FeatureVector> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(FeatureVector::new(vec![0.0, 0.0]))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_fetch_times_out_as_transient() {
        let service = MaintenanceService::new(
            Arc::new(StalledStore),
            model(),
            Arc::new(MemHistory::default()),
            AlertDispatcher::new(Arc::new(CountingTransport::default()), Duration::from_secs(1)),
            2,
        )
        .with_fetch_timeout(Duration::from_millis(100));
        let err = service.predict("PUMP-7", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TransientIo);
    }
}

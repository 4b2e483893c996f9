//! End-to-end checks of the prediction pipeline over HTTP with file-backed
//! feature store, model state and history log.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Days;
use warp::http::StatusCode;

use maintcast::alerts::{AlertDispatcher, AlertMessage, AlertTransport};
use maintcast::api::http::{routes, ErrorBody};
use maintcast::common::config::AppCfg;
use maintcast::common::time;
use maintcast::data::JsonFeatureStore;
use maintcast::history::CsvHistory;
use maintcast::model::{ForestModel, FsModelRepo, ModelRepo, RegressionTree, TreeNode};
use maintcast::{MaintError, MaintResult, MaintenanceService, PredictionResponse};

struct FlakyTransport {
    calls: AtomicUsize,
    fail: bool,
}

impl FlakyTransport {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertTransport for FlakyTransport {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn send(&self, _: &AlertMessage) -> MaintResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(MaintError::transient("smtp connection refused"))
        } else {
            Ok(())
        }
    }
}

/// Feature 0 (vibration, mm/s) picks the horizon: <= 2.0 means 5 days, else 1.
fn vibration_model() -> ForestModel {
    let tree = RegressionTree {
        nodes: vec![
            TreeNode::Split {
                feature: 0,
                threshold: 2.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 5.0 },
            TreeNode::Leaf { value: 1.0 },
        ],
    };
    ForestModel::new(3, vec![tree.clone(), tree]).unwrap()
}

struct Env {
    _dir: tempfile::TempDir,
    history_path: PathBuf,
    service: Arc<MaintenanceService>,
}

fn write_features(root: &Path) {
    let features = serde_json::json!({
        "EQUIP-001": [1.5, 60.0, 0.2],
        "EQUIP-002": [4.0, 75.0, 0.9],
        "EQUIP-003": [0.5, 40.0, 0.1],
    });
    std::fs::write(root.join("features.json"), features.to_string()).unwrap();
}

fn env_with(transport: Arc<FlakyTransport>, capacity: usize) -> Env {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    write_features(&root);

    let cfg = AppCfg::from_lookup(|key| match key {
        "MAINTCAST_DATA_ROOT" => Some(root.display().to_string()),
        _ => None,
    });
    FsModelRepo::new(&cfg).put_model(&vibration_model()).unwrap();
    let model = FsModelRepo::new(&cfg).load_model().unwrap();

    let service = MaintenanceService::new(
        Arc::new(JsonFeatureStore::new(&cfg)),
        Arc::new(model),
        Arc::new(CsvHistory::new(&cfg)),
        AlertDispatcher::new(transport, Duration::from_secs(1)),
        capacity,
    );

    Env {
        history_path: cfg.history_path.clone(),
        _dir: dir,
        service: Arc::new(service),
    }
}

async fn get(env: &Env, path: &str) -> (StatusCode, Vec<u8>) {
    let resp = warp::test::request()
        .method("GET")
        .path(path)
        .reply(&routes(env.service.clone()))
        .await;
    (resp.status(), resp.body().to_vec())
}

fn history_rows(env: &Env) -> Vec<String> {
    match std::fs::read_to_string(&env.history_path) {
        Ok(text) => text.lines().skip(1).map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn equip_001_five_days_out() {
    let env = env_with(FlakyTransport::new(false), 100);
    let (status, body) = get(&env, "/predict?equipment_id=EQUIP-001").await;
    assert_eq!(status, StatusCode::OK);

    let resp: PredictionResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(resp.equipment_id, "EQUIP-001");
    assert_eq!(resp.risk_score, 50.0);
    assert_eq!(
        resp.next_maintenance_date,
        time::today().checked_add_days(Days::new(5)).unwrap()
    );

    let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let date = raw["next_maintenance_date"].as_str().unwrap();
    assert_eq!(date.len(), 10);
    assert_eq!(&date[4..5], "-");
}

#[tokio::test]
async fn missing_equipment_is_404_with_detail() {
    let env = env_with(FlakyTransport::new(false), 100);
    let (status, body) = get(&env, "/predict?equipment_id=MISSING-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(raw, serde_json::json!({"detail": "Equipment data not found"}));
    assert!(history_rows(&env).is_empty());
}

#[tokio::test]
async fn history_grows_one_row_per_served_prediction() {
    let env = env_with(FlakyTransport::new(false), 100);
    for id in ["EQUIP-001", "EQUIP-002", "EQUIP-001", "MISSING-1"] {
        get(&env, &format!("/predict?equipment_id={id}")).await;
    }
    let rows = history_rows(&env);
    assert_eq!(rows.len(), 3);

    let (_, body) = get(&env, "/predict?equipment_id=EQUIP-002").await;
    let resp: PredictionResponse = serde_json::from_slice(&body).unwrap();
    let rows = history_rows(&env);
    let last: Vec<&str> = rows.last().unwrap().split(',').collect();
    assert_eq!(last[0], "EQUIP-002");
    assert_eq!(last[2], resp.next_maintenance_date.format("%Y-%m-%d").to_string());
    assert_eq!(last[3].parse::<f64>().unwrap(), resp.risk_score);
}

#[tokio::test]
async fn no_recipient_means_no_alert() {
    let transport = FlakyTransport::new(false);
    let env = env_with(transport.clone(), 100);
    get(&env, "/predict?equipment_id=EQUIP-001").await;
    // EQUIP-002 scores 90, above the default threshold; with no ops recipient
    // that only reaches the log.
    get(&env, "/predict?equipment_id=EQUIP-002").await;
    assert_eq!(transport.calls(), 0);

    get(&env, "/predict?equipment_id=EQUIP-001&alert_recipient=tech%40plant.local").await;
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn alert_failure_leaves_response_untouched() {
    let healthy = env_with(FlakyTransport::new(false), 100);
    let failing_transport = FlakyTransport::new(true);
    let failing = env_with(failing_transport.clone(), 100);

    let path = "/predict?equipment_id=EQUIP-003&alert_recipient=tech%40plant.local";
    let ok = get(&healthy, path).await;
    let degraded = get(&failing, path).await;

    assert_eq!(failing_transport.calls(), 1);
    assert_eq!(ok, degraded);
    assert_eq!(degraded.0, StatusCode::OK);
}

#[tokio::test]
async fn eviction_forces_a_recompute() {
    let env = env_with(FlakyTransport::new(false), 2);
    for id in ["EQUIP-001", "EQUIP-002", "EQUIP-003"] {
        get(&env, &format!("/predict?equipment_id={id}")).await;
    }
    let cache = env.service.cache();
    assert_eq!(cache.len(), 2);
    let misses = cache.stats().misses;

    get(&env, "/predict?equipment_id=EQUIP-001").await;
    assert_eq!(cache.stats().misses, misses + 1);

    get(&env, "/predict?equipment_id=EQUIP-001").await;
    assert_eq!(cache.stats().misses, misses + 1);
}

#[tokio::test]
async fn broken_feature_store_is_503() {
    let env = env_with(FlakyTransport::new(false), 100);
    std::fs::write(env.history_path.with_file_name("features.json"), "{truncated").unwrap();
    let (status, body) = get(&env, "/predict?equipment_id=EQUIP-001").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.detail, "Equipment data temporarily unavailable");
}

#[tokio::test]
async fn predictions_stay_in_range() {
    let env = env_with(FlakyTransport::new(false), 100);
    let today = time::today();
    for id in ["EQUIP-001", "EQUIP-002", "EQUIP-003"] {
        let resp = env.service.predict(id, None).await.unwrap();
        assert!((0.0..=100.0).contains(&resp.risk_score));
        assert!(resp.next_maintenance_date >= today);
    }
}

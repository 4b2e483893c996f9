//! Runtime configuration loaded from the process environment.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND: &str = "127.0.0.1:8000";
const DEFAULT_CACHE_CAPACITY: usize = 100;
const DEFAULT_HIGH_RISK_THRESHOLD: f64 = 80.0;

/// Snapshot of configuration values consumed by the service.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub data_root: PathBuf,
    pub bind: SocketAddr,
    pub log_level: String,
    pub model_path: PathBuf,
    pub features_path: PathBuf,
    pub history_path: PathBuf,
    pub cache_capacity: usize,
    /// Risk scores strictly above this value (0-100 scale) raise a system notification.
    pub high_risk_threshold: f64,
    pub fetch_timeout: Duration,
    pub alert_timeout: Duration,
    pub mail: MailCfg,
    pub ops_recipient: Option<String>,
}

/// Mail relay settings. Without a relay URL alerts are only logged.
#[derive(Clone, Debug, Default)]
pub struct MailCfg {
    pub relay_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub sender: String,
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let opt = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_root = PathBuf::from(env_or("MAINTCAST_DATA_ROOT", "./data"));
        let path_or = |key: &str, rel: &str| {
            opt(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| data_root.join(rel))
        };

        let bind = env_or("MAINTCAST_BIND", DEFAULT_BIND)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8000)));

        let cache_capacity = env_or("MAINTCAST_CACHE_CAPACITY", "")
            .parse()
            .ok()
            .filter(|cap: &usize| *cap > 0)
            .unwrap_or(DEFAULT_CACHE_CAPACITY);

        let high_risk_threshold = env_or("MAINTCAST_HIGH_RISK_THRESHOLD", "")
            .parse()
            .ok()
            .filter(|t: &f64| t.is_finite())
            .unwrap_or(DEFAULT_HIGH_RISK_THRESHOLD);

        let millis = |key: &str, default: u64| {
            Duration::from_millis(env_or(key, "").parse().unwrap_or(default))
        };

        Self {
            model_path: path_or("MAINTCAST_MODEL_PATH", "models/maintenance_model.json"),
            features_path: path_or("MAINTCAST_FEATURES_PATH", "features.json"),
            history_path: path_or("MAINTCAST_HISTORY_PATH", "maintenance_history.csv"),
            data_root,
            bind,
            log_level: env_or("MAINTCAST_LOG_LEVEL", "info"),
            cache_capacity,
            high_risk_threshold,
            fetch_timeout: millis("MAINTCAST_FETCH_TIMEOUT_MS", 2_000),
            alert_timeout: millis("MAINTCAST_ALERT_TIMEOUT_MS", 5_000),
            mail: MailCfg {
                relay_url: opt("MAINTCAST_MAIL_RELAY_URL"),
                user: opt("MAINTCAST_MAIL_USER"),
                password: opt("MAINTCAST_MAIL_PASSWORD"),
                sender: env_or("MAINTCAST_MAIL_SENDER", "maintcast@localhost"),
            },
            ops_recipient: opt("MAINTCAST_OPS_RECIPIENT"),
        }
    }
}

/// Convenience wrapper used by the binary.
pub fn load_cfg() -> AppCfg {
    AppCfg::load()
}

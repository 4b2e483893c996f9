use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use maintcast::api;
use maintcast::common::{config, log};
use maintcast::inference::MaintenanceService;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::load_cfg();
    log::init(&cfg.log_level);

    let service = MaintenanceService::from_cfg(&cfg)
        .context("failed to initialise the prediction service")?;
    let routes = api::routes(Arc::new(service));

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(cfg.bind, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .with_context(|| format!("failed to bind {}", cfg.bind))?;

    info!(
        ev = "server_started",
        addr = %addr,
        features = %cfg.features_path.display(),
        history = %cfg.history_path.display(),
        cache_capacity = cfg.cache_capacity,
    );
    server.await;
    info!(ev = "server_stopped");
    Ok(())
}

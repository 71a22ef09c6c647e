//! Proctored Exams - Main Entry Point

use std::sync::Arc;

use anyhow::Context;
use exam_service::{create_limited_router, init_logging, run_server, AppState, ServiceSettings};
use metrics_exporter_prometheus::PrometheusBuilder;
use proctoring::Proctor;
use tokio::sync::RwLock;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ServiceSettings::load().context("loading settings")?;
    init_logging(settings.log_json);

    info!("=== Proctored Exams v{} ===", env!("CARGO_PKG_VERSION"));

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    // Model load failures stop startup here, before any exam begins
    let proctor =
        Proctor::from_config(settings.proctoring.clone()).context("loading proctoring detectors")?;
    info!(source = ?settings.proctoring.source, evidence = %settings.proctoring.evidence_root.display(), "Proctoring ready");

    let state = Arc::new(RwLock::new(AppState::new(proctor).with_prometheus(prometheus)));
    let app = create_limited_router(state, &settings.rate_limit)?;

    run_server(&settings.bind_addr, app).await?;
    Ok(())
}

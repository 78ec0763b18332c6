//! incident-stream — Binary Entrypoint
//! Watches a drop directory for incident files and republishes department and
//! year aggregates after every batch. Stops cleanly on Ctrl-C once the batch
//! in flight has finished.

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use incident_stream::{
    api, metrics::Metrics, IngestScheduler, JsonFileSink, LogSink, PipelineConfig, SharedSnapshot,
};

/// `LOG_FORMAT=json` switches to JSON lines; default is compact text.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("incident_stream=info,ingest=info,snapshot=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PipelineConfig::load_default().context("loading pipeline config")?;
    tracing::info!(?cfg, "configuration loaded");

    let shared = SharedSnapshot::new();
    let mut scheduler = IngestScheduler::from_config(&cfg)?.with_sink(shared.clone());
    if cfg.log_snapshots {
        scheduler = scheduler.with_sink(LogSink);
    }
    if let Some(path) = &cfg.snapshot_path {
        scheduler = scheduler.with_sink(JsonFileSink::new(path.clone()));
    }

    let (stop_tx, stop_rx) = watch::channel(false);

    let server = match &cfg.http_addr {
        Some(addr) => {
            let metrics = Metrics::init(cfg.poll_interval_secs)?;
            let app = api::router(shared.clone(), Some(&metrics));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            tracing::info!(%addr, "serving /snapshot, /health and /metrics");

            let mut server_stop = stop_rx.clone();
            Some(tokio::spawn(async move {
                let shutdown = async move {
                    let _ = server_stop.wait_for(|stopped| *stopped).await;
                };
                if let Err(e) = axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await
                {
                    tracing::warn!("http server error: {e:#}");
                }
            }))
        }
        None => None,
    };

    let pipeline = tokio::spawn(scheduler.run(cfg.poll_interval(), stop_rx));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("shutdown requested; finishing current batch");
    let _ = stop_tx.send(true);

    let scheduler = pipeline.await.context("pipeline task panicked")?;
    let snap = scheduler.snapshot();
    tracing::info!(
        batches = snap.batches,
        total_records = snap.total_records,
        "pipeline stopped"
    );

    if let Some(handle) = server {
        let _ = handle.await;
    }
    Ok(())
}

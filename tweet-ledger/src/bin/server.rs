//! Tweet ledger server binary

use anyhow::Context;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use tweet_ledger::{metrics::Metrics, Config, Ledger};

// Prometheus metrics endpoint
async fn metrics_handler(State(metrics): State<Metrics>) -> Result<String, (StatusCode, String)> {
    metrics.export().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to export metrics: {}", e),
        )
    })
}

async fn serve_metrics(addr: String, metrics: Metrics) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding metrics listener on {}", addr))?;
    tracing::info!(addr = %addr, "Serving Prometheus metrics at /metrics");

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting tweet ledger server");

    // Load configuration
    let config = match std::env::var("TWEET_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        Err(_) => Config::from_env().context("loading config from environment")?,
    };
    let metrics_addr = config.metrics_listen_addr.clone();

    // Open ledger
    let ledger = Ledger::open(config).await.context("opening ledger")?;

    let verified = ledger
        .verify_audit_chain()
        .context("verifying audit chain")?;
    let summary = ledger.summary().await?;
    tracing::info!(
        owner = %summary.owner,
        tweets = summary.active_tweets,
        balance = %summary.balance,
        events = verified,
        "Ledger ready"
    );

    let mut metrics_server = tokio::spawn(serve_metrics(metrics_addr, ledger.metrics().clone()));

    // Transport layers attach here; the core only needs the handle
    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        served = &mut metrics_server => served.context("metrics server task")??,
    }
    metrics_server.abort();

    tracing::info!("Shutting down tweet ledger server");
    ledger.shutdown().await?;
    Ok(())
}

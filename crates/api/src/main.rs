use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rowmark_api::app::{build_app, services};
use rowmark_api::ApiConfig;
use rowmark_infra::jobs::JobWorkerConfig;

/// Upper bound on waiting for the worker to finish its in-flight job.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rowmark_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(services::build_services(&config)?);

    let worker = services
        .spawn_worker(JobWorkerConfig::default().with_poll_interval(config.poll_interval))
        .context("failed to start job worker")?;

    let app = build_app(services, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        data_dir = %config.data_dir.display(),
        queue_backend = ?config.queue_backend,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    tracing::info!("http server stopped; stopping job worker");
    let stop = tokio::task::spawn_blocking(move || worker.shutdown());
    match tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, stop).await {
        Ok(Ok(())) => tracing::info!("job worker stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "job worker panicked during shutdown"),
        Err(_) => {
            tracing::warn!(
                timeout_secs = WORKER_SHUTDOWN_TIMEOUT.as_secs(),
                "job worker did not stop in time; exiting anyway"
            );
            // Dropping the runtime would wait on the blocking join.
            std::process::exit(0);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

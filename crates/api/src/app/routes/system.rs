use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode};
use rowmark_core::{BlobClass, JobId};
use rowmark_infra::blob_store::BlobStore;
use tracing::warn;

use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Liveness: the process is serving requests.
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// Readiness: the queue back-end and the blob store both answer.
pub async fn readyz(Extension(services): Extension<Arc<AppServices>>) -> StatusCode {
    let check = tokio::task::spawn_blocking(move || {
        services.queue.pending_len().map_err(|e| e.to_string())?;
        services
            .blobs
            .exists(BlobClass::Raw, JobId::new())
            .map_err(|e| e.to_string())?;
        Ok::<_, String>(())
    })
    .await;

    match check {
        Ok(Ok(())) => StatusCode::OK,
        Ok(Err(e)) => {
            warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(e) => {
            warn!(error = %e, "readiness check panicked");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

//! Upload / download / status handlers.
//!
//! Store and queue calls are synchronous (filesystem, Redis) and run on the
//! blocking pool.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Multipart, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use rowmark_core::{JobId, JobState};
use rowmark_infra::blob_store::BlobStore;
use rowmark_infra::jobs::QueueError;

use crate::app::errors;
use crate::app::services::AppServices;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Accepted upload extensions (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "txt"];

pub fn is_allowed_extension(file_name: &str) -> bool {
    FsPath::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: JobId,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: JobId,
    pub state: JobState,
}

/// `POST /API/upload`
pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let mut file: Option<(String, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return errors::json_error(e.status(), "invalid_multipart", e.body_text()),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => {
                file = Some((file_name, bytes));
                break;
            }
            Err(e) => return errors::json_error(e.status(), "invalid_multipart", e.body_text()),
        }
    }

    let Some((file_name, bytes)) = file else {
        return errors::json_error(StatusCode::BAD_REQUEST, "missing_file", "missing file");
    };

    if !is_allowed_extension(&file_name) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_file_type",
            "invalid file type; only .csv and .txt are accepted",
        );
    }

    let id = JobId::new();
    let size = bytes.len();

    let svc = services.clone();
    let saved = tokio::task::spawn_blocking(move || svc.blobs.save_raw(id, &bytes)).await;
    match saved {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(job_id = %id, error = %e, "failed to store upload");
            return errors::blob_error_to_response(e);
        }
        Err(e) => return errors::internal_error(e.to_string()),
    }

    let svc = services.clone();
    let queued = tokio::task::spawn_blocking(move || svc.queue.enqueue(id)).await;
    match queued {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(job_id = %id, error = %e, "failed to enqueue upload");
            return errors::queue_error_to_response(e);
        }
        Err(e) => return errors::internal_error(e.to_string()),
    }

    info!(job_id = %id, file_name = %file_name, bytes = size, "upload accepted");
    (StatusCode::OK, Json(UploadResponse { id })).into_response()
}

/// `GET /API/download/:id`
pub async fn download(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let state = match lookup_state(&services, id).await {
        Ok(state) => state,
        Err(resp) => return resp,
    };

    match state {
        JobState::Processing => errors::json_error(
            StatusCode::LOCKED,
            "processing",
            "file is still being processed; retry later",
        ),
        JobState::Failed => errors::json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "job_failed",
            "processing failed for this file",
        ),
        JobState::Done => {
            let svc = services.clone();
            match tokio::task::spawn_blocking(move || svc.blobs.load_processed(id)).await {
                Ok(Ok(bytes)) => {
                    ([(header::CONTENT_TYPE, "text/csv")], bytes).into_response()
                }
                Ok(Err(e)) => {
                    error!(job_id = %id, error = %e, "done job has no readable output");
                    errors::blob_error_to_response(e)
                }
                Err(e) => errors::internal_error(e.to_string()),
            }
        }
    }
}

/// `GET /API/status/:id`
pub async fn status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match lookup_state(&services, id).await {
        Ok(state) => Json(StatusResponse { id, state }).into_response(),
        Err(resp) => resp,
    }
}

fn parse_id(raw: &str) -> Result<JobId, axum::response::Response> {
    raw.parse::<JobId>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

async fn lookup_state(
    services: &Arc<AppServices>,
    id: JobId,
) -> Result<JobState, axum::response::Response> {
    let svc = services.clone();
    match tokio::task::spawn_blocking(move || svc.queue.get_state(id)).await {
        Ok(Ok(state)) => Ok(state),
        Ok(Err(e @ QueueError::NotFound(_))) => Err(errors::queue_error_to_response(e)),
        Ok(Err(e)) => {
            error!(job_id = %id, error = %e, "failed to read job state");
            Err(errors::queue_error_to_response(e))
        }
        Err(e) => Err(errors::internal_error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_csv_and_txt_in_any_case() {
        assert!(is_allowed_extension("people.csv"));
        assert!(is_allowed_extension("people.CSV"));
        assert!(is_allowed_extension("notes.Txt"));
        assert!(is_allowed_extension("archive.tar.csv"));
    }

    #[test]
    fn rejects_other_or_missing_extensions() {
        assert!(!is_allowed_extension("people.xlsx"));
        assert!(!is_allowed_extension("people.csv.exe"));
        assert!(!is_allowed_extension("csv"));
        assert!(!is_allowed_extension(""));
        assert!(!is_allowed_extension(".csv"));
    }

    #[test]
    fn status_response_shape() {
        let id = JobId::new();
        let body = serde_json::to_value(StatusResponse {
            id,
            state: JobState::Processing,
        })
        .unwrap();
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["state"], "processing");
    }
}

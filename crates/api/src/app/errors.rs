use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use rowmark_infra::blob_store::BlobStoreError;
use rowmark_infra::jobs::QueueError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn queue_error_to_response(err: QueueError) -> axum::response::Response {
    match err {
        QueueError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("no job with id {id}"))
        }
        QueueError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "queue_error", msg)
        }
        QueueError::Corrupt(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "corrupt_entry", msg)
        }
    }
}

pub fn blob_error_to_response(err: BlobStoreError) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", err.to_string())
}

pub fn internal_error(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
}

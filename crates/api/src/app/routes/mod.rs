use axum::{
    routing::{get, post},
    Router,
};

pub mod files;
pub mod system;

/// Router for the job endpoints, mounted under `/API`.
pub fn router() -> Router {
    Router::new()
        .route("/upload", post(files::upload))
        .route("/download/:id", get(files::download))
        .route("/status/:id", get(files::status))
}

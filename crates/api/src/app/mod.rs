//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: blob store, job queue and worker wiring
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses
//!
//! Every response goes through request tracing, gzip compression (when the
//! client accepts it) and a fixed set of security headers.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue},
    routing::get,
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::config::ApiConfig;

pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>, config: &ApiConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::system::health))
        .route("/livez", get(routes::system::livez))
        .route("/readyz", get(routes::system::readyz))
        .nest("/API", routes::router())
        .layer(Extension(services));

    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    app.layer(DefaultBodyLimit::max(config.max_upload_bytes)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new()),
    )
}

/// Response headers set on every reply unless the handler already set them.
pub const SECURITY_HEADERS: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("x-xss-protection", "0"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
];

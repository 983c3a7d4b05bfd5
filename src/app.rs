use crate::{handlers, intake::IntakeProvider};
use axum::{Router, extract::DefaultBodyLimit, routing::post};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

// Maximum allowed size for upload requests
pub const MAX_UPLOAD_SIZE_BYTES: usize = 100 * 1024 * 1024; // 100MB

pub type SharedIntake = Arc<IntakeProvider>;

pub fn create_app(intake: SharedIntake, public_dir: &str) -> Router {
    Router::new()
        // The conversion pipeline
        .route("/upload", post(handlers::upload_pdf))
        // Static front-end assets at the root path
        .fallback_service(ServeDir::new(public_dir))
        // Apply a layer to limit the maximum size of request bodies
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE_BYTES))
        // Add CORS layer for broader client compatibility
        .layer(CorsLayer::permissive())
        // Add tracing for HTTP requests and responses
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        // Provide the shared state
        .with_state(intake)
}

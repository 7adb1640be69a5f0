//! wfp-up library - Waveform peaks upload service
//!
//! Accepts an uploaded MP3, runs the external analysis tool twice (a duration
//! probe, then a peak data pass at a density planned from that duration) and
//! returns the duration and raw peak dataset.

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod intake;
pub mod pipeline;
pub mod render;
pub mod tool;

pub use crate::error::{ApiError, ApiResult, PipelineError};

use crate::pipeline::Pipeline;

/// Application state shared across HTTP handlers
///
/// Read-only after startup; requests share no mutable state.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline with its tool and startup configuration
    pub pipeline: Arc<Pipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    let body_limit = intake::body_limit(state.pipeline.settings().max_upload_bytes);

    // Upload routes carry their own body limit sized to the file ceiling
    let uploads = Router::new()
        .route("/upload", post(api::upload_page))
        .route("/api/peaks", post(api::create_peaks))
        .layer(DefaultBodyLimit::max(body_limit));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .merge(api::health_routes());

    Router::new()
        .merge(uploads)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

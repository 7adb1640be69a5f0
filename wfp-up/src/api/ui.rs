//! UI serving routes

use axum::{extract::State, response::Html};

use crate::{render, AppState};

/// GET /
///
/// Serves the upload form
pub async fn serve_index(State(state): State<AppState>) -> Html<String> {
    Html(render::index_page(state.pipeline.settings().max_upload_bytes))
}

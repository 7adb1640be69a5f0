//! Upload endpoints
//!
//! `POST /upload` answers with an HTML page, `POST /api/peaks` with JSON. Both
//! read the same multipart body and run the same pipeline; each request runs
//! inside its own span tagged with a fresh request id.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, ERROR_KIND_HEADER};
use crate::intake;
use crate::pipeline::{PeakReport, PipelineOutcome};
use crate::{render, AppState};

/// Intake and pipeline for one request
async fn analyze(state: &AppState, multipart: Multipart) -> ApiResult<PipelineOutcome> {
    let span = info_span!("upload", request_id = %Uuid::new_v4());
    async {
        let max_bytes = state.pipeline.settings().max_upload_bytes;
        let intake = intake::read_upload(multipart, max_bytes).await?;
        Ok(state.pipeline.process(intake).await)
    }
    .instrument(span)
    .await
}

/// POST /upload
///
/// Results page on success, short message page on failure
pub async fn upload_page(State(state): State<AppState>, multipart: Multipart) -> Response {
    let outcome = match analyze(&state, multipart).await {
        Ok(outcome) => outcome,
        Err(err) => return err.into_response(),
    };

    match outcome {
        PipelineOutcome::Success(report) => {
            (StatusCode::OK, Html(render::results_page(&report))).into_response()
        }
        PipelineOutcome::Failure(err) => (
            err.status_code(),
            [(ERROR_KIND_HEADER, err.kind().as_str())],
            Html(render::failure_page(&err)),
        )
            .into_response(),
    }
}

/// JSON body for a successful `/api/peaks` request
#[derive(Debug, Serialize)]
pub struct PeaksResponse {
    pub filename: String,
    /// Full-precision duration in seconds
    pub duration_seconds: f64,
    /// Duration truncated to whole seconds
    pub duration_display: u64,
    pub samples_per_second: u32,
    /// Peak dataset exactly as the tool produced it
    pub peaks_data: String,
}

impl From<PeakReport> for PeaksResponse {
    fn from(report: PeakReport) -> Self {
        Self {
            duration_display: report.display_duration(),
            peaks_data: report.peak_text(),
            filename: report.filename,
            duration_seconds: report.duration_secs,
            samples_per_second: report.samples_per_second,
        }
    }
}

/// POST /api/peaks
pub async fn create_peaks(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<PeaksResponse>> {
    let report = analyze(&state, multipart)
        .await?
        .into_result()
        .map_err(ApiError::from)?;
    Ok(Json(report.into()))
}

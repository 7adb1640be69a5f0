//! End-to-end pipeline test against a real child process
//!
//! A shell script stands in for audiowaveform: it consumes stdin, reports a
//! decoded duration on stderr in summary mode and echoes the requested
//! density as JSON in data mode. Kept in its own test binary so no other test
//! forks while the script file is being written.

#![cfg(unix)]

mod helpers;

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tempfile::TempDir;
use tower::util::ServiceExt;
use wfp_up::config::PipelineSettings;
use wfp_up::pipeline::Pipeline;
use wfp_up::tool::ProcessTool;
use wfp_up::{build_router, AppState};

use helpers::{body_text, file_part, upload_request};

const FAKE_TOOL: &str = r#"#!/bin/sh
cat > /dev/null
case "$*" in
  *--bits*)
    pps=$(echo "$*" | sed 's/.*--pixels-per-second \([0-9]*\).*/\1/')
    printf '{"pixels_per_second":%s}' "$pps"
    ;;
  *)
    echo "Input file: -" >&2
    echo "Frames decoded: 6891 (3:00.000)" >&2
    ;;
esac
"#;

#[tokio::test]
async fn test_two_passes_through_child_process() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("fake-audiowaveform");
    std::fs::write(&script, FAKE_TOOL).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let tool = ProcessTool::new(script.to_string_lossy().into_owned(), Duration::from_secs(20));
    let pipeline = Pipeline::new(Arc::new(tool), PipelineSettings::default());
    let app = build_router(AppState::new(pipeline));

    let audio = vec![0xFFu8; 256 * 1024];
    let response = app
        .oneshot(upload_request("/api/peaks", &[file_part("track.mp3", &audio)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_str(&body_text(response.into_body()).await).unwrap();
    assert_eq!(body["duration_seconds"], 180.0);
    assert_eq!(body["duration_display"], 180);
    assert_eq!(body["samples_per_second"], 8);
    assert_eq!(body["peaks_data"], r#"{"pixels_per_second":8}"#);
}

//! Test Helper Utilities
//!
//! Shared utilities for testing wfp-up: a scripted analysis tool and a
//! multipart body builder.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use std::sync::{Arc, Mutex};
use wfp_up::config::PipelineSettings;
use wfp_up::pipeline::Pipeline;
use wfp_up::tool::{AnalysisTool, Invocation, ToolError, ToolOutput};
use wfp_up::{build_router, AppState};

pub const BOUNDARY: &str = "wfp-test-boundary";

/// Analysis tool that answers each pass from a queue
pub struct ScriptedTool {
    replies: Mutex<Vec<Result<ToolOutput, ToolError>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedTool {
    pub fn new(mut replies: Vec<Result<ToolOutput, ToolError>>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisTool for ScriptedTool {
    async fn run(&self, invocation: &Invocation, _input: &[u8]) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(invocation.clone());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .expect("unexpected extra tool invocation")
    }
}

/// Tool reply with exit code and output streams
pub fn exited(code: i32, stdout: &str, stderr: &str) -> Result<ToolOutput, ToolError> {
    Ok(ToolOutput {
        exit_code: Some(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    })
}

/// Router over a scripted tool with the given upload ceiling
pub fn app_with(tool: Arc<ScriptedTool>, max_upload_bytes: u64) -> axum::Router {
    let settings = PipelineSettings {
        max_upload_bytes,
        ..PipelineSettings::default()
    };
    build_router(AppState::new(Pipeline::new(tool, settings)))
}

/// Router over a scripted tool with default settings
pub fn app(tool: Arc<ScriptedTool>) -> axum::Router {
    app_with(tool, PipelineSettings::default().max_upload_bytes)
}

/// One multipart part: field name, optional filename, content
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn file_part<'a>(filename: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name: "file",
        filename: Some(filename),
        data,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: audio/mpeg\r\n\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// POST a multipart body to `uri`
pub fn upload_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Read a whole response body as text
pub async fn body_text(body: Body) -> String {
    let bytes = body
        .collect()
        .await
        .expect("Should read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body should be UTF-8")
}

//! Upload intake
//!
//! Reads a `multipart/form-data` body and reduces it to an [`IntakeOutcome`].
//! Only a part named `file` that carries a filename is accepted. The size
//! ceiling is enforced while streaming: once a file part crosses it the
//! buffered bytes are released and the rest of the part is drained, so an
//! oversized upload never sits in memory.

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::debug;

use crate::error::{ApiError, PipelineError};

/// Form field carrying the audio file
pub const FILE_FIELD: &str = "file";

/// Extra body allowance on top of the file ceiling for multipart framing
pub const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Fully received upload, owned by its request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAudio {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedAudio {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }
}

/// Result of reading the upload body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// No `file` part was present
    NoFile,
    /// A `file` part exceeded the ceiling
    TooBig { max_bytes: u64 },
    /// A complete upload within the ceiling
    Received(UploadedAudio),
}

impl IntakeOutcome {
    /// Split into the upload to process or the terminal intake failure
    ///
    /// An oversized upload takes precedence over everything else.
    pub fn into_upload(self) -> Result<UploadedAudio, PipelineError> {
        match self {
            Self::TooBig { max_bytes } => Err(PipelineError::FileTooLarge { max_bytes }),
            Self::NoFile => Err(PipelineError::NoFileProvided),
            Self::Received(upload) => Ok(upload),
        }
    }
}

/// Body limit for upload routes: ceiling plus multipart framing
pub fn body_limit(max_upload_bytes: u64) -> usize {
    usize::try_from(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)).unwrap_or(usize::MAX)
}

/// Read every part of the body
///
/// When several `file` parts are sent the last one wins; the too-big signal
/// is sticky across parts.
pub async fn read_upload(mut multipart: Multipart, max_bytes: u64) -> Result<IntakeOutcome, ApiError> {
    let mut file: Option<UploadedAudio> = None;
    let mut too_big = false;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) if exceeds_body_limit(&err) => return Ok(IntakeOutcome::TooBig { max_bytes }),
            Err(err) => return Err(multipart_error(err)),
        };
        let is_file_part = field.name() == Some(FILE_FIELD);
        let Some(filename) = field.file_name().map(str::to_string) else {
            debug!(field = ?field.name(), "Skipping non-file form field");
            continue;
        };
        if !is_file_part {
            debug!(field = ?field.name(), "Skipping unrelated file part");
            continue;
        }

        let mut data = Vec::new();
        let mut size: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) if exceeds_body_limit(&err) => {
                    return Ok(IntakeOutcome::TooBig { max_bytes })
                }
                Err(err) => return Err(multipart_error(err)),
            };
            size += chunk.len() as u64;
            if size > max_bytes {
                if !too_big {
                    debug!(filename = %filename, max_bytes, "Upload exceeded size ceiling");
                }
                too_big = true;
                data = Vec::new();
            } else {
                data.extend_from_slice(&chunk);
            }
        }

        debug!(filename = %filename, bytes = size, "Received file part");
        file = Some(UploadedAudio::new(filename, data));
    }

    Ok(if too_big {
        IntakeOutcome::TooBig { max_bytes }
    } else {
        match file {
            Some(upload) => IntakeOutcome::Received(upload),
            None => IntakeOutcome::NoFile,
        }
    })
}

/// The body as a whole ran past the route's body limit
fn exceeds_body_limit(err: &MultipartError) -> bool {
    err.status() == StatusCode::PAYLOAD_TOO_LARGE
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Malformed upload: {}", err))
}

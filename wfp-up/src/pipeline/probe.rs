//! Duration probe: first pass over the upload
//!
//! Runs the tool in summary mode and keeps only its diagnostic stream, from
//! which the decoded duration is recovered.

use tracing::debug;

use super::duration::DiagnosticParser;
use super::tool_failure;
use crate::config::PipelineSettings;
use crate::error::{PipelineError, Stage};
use crate::intake::UploadedAudio;
use crate::tool::{AnalysisTool, Invocation};

/// Exit status and diagnostics of the probe pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub exit_code: Option<i32>,
    pub diagnostic_text: String,
}

impl ProbeResult {
    /// Interpret the probe pass
    ///
    /// A non-zero exit is a failure whatever the diagnostics say.
    pub fn duration(self, parser: &dyn DiagnosticParser) -> Result<f64, PipelineError> {
        if self.exit_code != Some(0) {
            return Err(PipelineError::ProbePassFailed {
                exit_code: self.exit_code,
                diagnostic: self.diagnostic_text,
            });
        }

        parser
            .decoded_duration(&self.diagnostic_text)
            .ok_or(PipelineError::DurationUnparseable {
                diagnostic: self.diagnostic_text,
            })
    }
}

/// Run the probe pass and return the measured duration in seconds
pub async fn probe_duration(
    tool: &dyn AnalysisTool,
    parser: &dyn DiagnosticParser,
    settings: &PipelineSettings,
    upload: &UploadedAudio,
) -> Result<f64, PipelineError> {
    let invocation = Invocation {
        args: settings.probe_args(),
        capture_stdout: false,
    };

    let output = tool
        .run(&invocation, &upload.bytes)
        .await
        .map_err(|e| tool_failure(Stage::Probe, e))?;

    let result = ProbeResult {
        exit_code: output.exit_code,
        diagnostic_text: output.diagnostic_text(),
    };
    debug!(exit_code = ?result.exit_code, "Probe pass finished");

    result.duration(parser)
}

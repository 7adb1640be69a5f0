//! Peak data generator: second pass over the upload

use tracing::debug;

use super::tool_failure;
use crate::config::PipelineSettings;
use crate::error::{PipelineError, Stage};
use crate::intake::UploadedAudio;
use crate::tool::{AnalysisTool, Invocation};

/// Run the data pass at `samples_per_second` and return the raw peak dataset
///
/// Stdout is relayed as-is; its structure is never inspected.
pub async fn generate_peaks(
    tool: &dyn AnalysisTool,
    settings: &PipelineSettings,
    upload: &UploadedAudio,
    samples_per_second: u32,
) -> Result<Vec<u8>, PipelineError> {
    let invocation = Invocation {
        args: settings.data_args(samples_per_second),
        capture_stdout: true,
    };

    let output = tool
        .run(&invocation, &upload.bytes)
        .await
        .map_err(|e| tool_failure(Stage::Generate, e))?;

    debug!(
        exit_code = ?output.exit_code,
        peak_bytes = output.stdout.len(),
        "Data pass finished"
    );

    if !output.success() {
        return Err(PipelineError::DataPassFailed {
            exit_code: output.exit_code,
            diagnostic: output.diagnostic_text(),
        });
    }

    Ok(output.stdout)
}

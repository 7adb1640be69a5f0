//! Two-pass waveform pipeline
//!
//! Per request: intake → probe → planning → generating → one
//! [`PipelineOutcome`]. The stages run strictly in sequence and share
//! nothing with other requests; the only inputs are the upload and the
//! startup configuration.
//!
//! ```text
//! Intake ──► NoFile | TooBig                       (no tool is spawned)
//!    └────► Probing ──► ProbeInputError | ProbeFailed | DurationUnparseable
//!              └────► Planning ──► Generating ──► DataInputError | DataFailed
//!                                        └────► Success
//! ```

pub mod density;
pub mod duration;
pub mod generate;
pub mod probe;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::PipelineSettings;
use crate::error::{ErrorKind, PipelineError, Stage};
use crate::intake::{IntakeOutcome, UploadedAudio};
use crate::tool::{AnalysisTool, ToolError};

pub use density::planned_density;
pub use duration::{DiagnosticParser, FramesDecodedParser};
pub use probe::ProbeResult;

/// Successful pipeline result
#[derive(Debug, Clone, PartialEq)]
pub struct PeakReport {
    pub filename: String,
    /// Full-precision duration from the probe pass
    pub duration_secs: f64,
    /// Density the data pass ran at
    pub samples_per_second: u32,
    /// Opaque output of the data pass
    pub peak_data: Vec<u8>,
}

impl PeakReport {
    /// Duration truncated to whole seconds for display
    pub fn display_duration(&self) -> u64 {
        self.duration_secs.max(0.0).trunc() as u64
    }

    /// Peak dataset as text (lossy UTF-8)
    pub fn peak_text(&self) -> String {
        String::from_utf8_lossy(&self.peak_data).into_owned()
    }
}

/// Exactly one of these is produced per request
#[derive(Debug)]
pub enum PipelineOutcome {
    Success(PeakReport),
    Failure(PipelineError),
}

impl PipelineOutcome {
    pub fn into_result(self) -> Result<PeakReport, PipelineError> {
        match self {
            Self::Success(report) => Ok(report),
            Self::Failure(err) => Err(err),
        }
    }
}

/// In-flight state of a request that passed intake
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Probing,
    Planning { duration_secs: f64 },
    Generating { duration_secs: f64, samples_per_second: u32 },
}

impl PipelineState {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Probing => Stage::Probe,
            Self::Planning { .. } => Stage::Planning,
            Self::Generating { .. } => Stage::Generate,
        }
    }
}

/// Result of advancing one state
#[derive(Debug)]
enum Transition {
    Next(PipelineState),
    Done(PeakReport),
}

/// Drives both passes of the analysis tool for one upload at a time
pub struct Pipeline {
    tool: Arc<dyn AnalysisTool>,
    parser: Arc<dyn DiagnosticParser>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(tool: Arc<dyn AnalysisTool>, settings: PipelineSettings) -> Self {
        Self {
            tool,
            parser: Arc::new(FramesDecodedParser),
            settings,
        }
    }

    /// Replace the diagnostic parser (for tools with a different log format)
    pub fn with_parser(mut self, parser: Arc<dyn DiagnosticParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Turn an intake result into an outcome
    ///
    /// Missing and oversized uploads end here without spawning anything.
    pub async fn process(&self, intake: IntakeOutcome) -> PipelineOutcome {
        match intake.into_upload() {
            Ok(upload) => self.run(&upload).await,
            Err(err) => self.assemble(Err(err)),
        }
    }

    /// Run probe, planning and generation for a received upload
    pub async fn run(&self, upload: &UploadedAudio) -> PipelineOutcome {
        info!(
            filename = %upload.filename,
            bytes = upload.byte_length(),
            "Processing upload"
        );

        let mut state = PipelineState::Probing;
        loop {
            let from = state.stage();
            match self.step(state, upload).await {
                Ok(Transition::Next(next)) => {
                    debug!(from = %from, to = %next.stage(), "Pipeline transition");
                    state = next;
                }
                Ok(Transition::Done(report)) => return self.assemble(Ok(report)),
                Err(err) => return self.assemble(Err(err)),
            }
        }
    }

    async fn step(&self, state: PipelineState, upload: &UploadedAudio) -> Result<Transition, PipelineError> {
        match state {
            PipelineState::Probing => {
                let duration_secs =
                    probe::probe_duration(self.tool.as_ref(), self.parser.as_ref(), &self.settings, upload)
                        .await?;
                Ok(Transition::Next(PipelineState::Planning { duration_secs }))
            }
            PipelineState::Planning { duration_secs } => {
                let samples_per_second = planned_density(duration_secs, self.settings.target_peak_count);
                debug!(duration_secs, samples_per_second, "Planned output density");
                Ok(Transition::Next(PipelineState::Generating {
                    duration_secs,
                    samples_per_second,
                }))
            }
            PipelineState::Generating {
                duration_secs,
                samples_per_second,
            } => {
                let peak_data =
                    generate::generate_peaks(self.tool.as_ref(), &self.settings, upload, samples_per_second)
                        .await?;
                Ok(Transition::Done(PeakReport {
                    filename: upload.filename.clone(),
                    duration_secs,
                    samples_per_second,
                    peak_data,
                }))
            }
        }
    }

    /// Produce the outcome and log it; failures keep their diagnostics server-side
    fn assemble(&self, result: Result<PeakReport, PipelineError>) -> PipelineOutcome {
        match result {
            Ok(report) => {
                info!(
                    filename = %report.filename,
                    duration_secs = report.duration_secs,
                    samples_per_second = report.samples_per_second,
                    peak_bytes = report.peak_data.len(),
                    "Waveform data generated"
                );
                PipelineOutcome::Success(report)
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::NoFileProvided | ErrorKind::FileTooLarge => {
                        warn!(kind = %err.kind(), "Upload rejected: {}", err);
                    }
                    _ => {
                        error!(
                            stage = %err.stage(),
                            kind = %err.kind(),
                            diagnostic = err.diagnostic().unwrap_or(""),
                            "Pipeline failed: {}",
                            err
                        );
                    }
                }
                PipelineOutcome::Failure(err)
            }
        }
    }
}

/// Map a tool invocation error onto the failure taxonomy for `stage`
pub(crate) fn tool_failure(stage: Stage, err: ToolError) -> PipelineError {
    match err {
        ToolError::Spawn { .. } => PipelineError::UnsupportedOrCorruptInput {
            stage,
            detail: err.to_string(),
            diagnostic: String::new(),
        },
        ToolError::InputWrite { source, diagnostic } => PipelineError::UnsupportedOrCorruptInput {
            stage,
            detail: source.to_string(),
            diagnostic,
        },
        ToolError::TimedOut(timeout) => PipelineError::ToolTimedOut { stage, timeout },
        ToolError::Io(source) => match stage {
            Stage::Generate => PipelineError::DataPassFailed {
                exit_code: None,
                diagnostic: source.to_string(),
            },
            _ => PipelineError::ProbePassFailed {
                exit_code: None,
                diagnostic: source.to_string(),
            },
        },
    }
}

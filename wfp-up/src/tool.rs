//! External analysis tool invocation
//!
//! Each call to [`AnalysisTool::run`] is one pass: spawn the tool, stream the
//! whole input buffer into its stdin while draining stdout and stderr, then
//! reap the child. Writing and draining run concurrently so a tool that emits
//! output before it has consumed all of its input cannot deadlock the pass.
//!
//! The child is reaped on every path (success, input-write failure, timeout)
//! before a result is returned, and is spawned with `kill_on_drop` so a
//! dropped request future cannot leave it running.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};

/// Tool invocation errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The tool closed its input or exited before consuming the whole buffer
    #[error("Failed to deliver input: {source}")]
    InputWrite {
        #[source]
        source: io::Error,
        /// Diagnostic text captured before the child was reaped
        diagnostic: String,
    },

    /// Reading output or waiting for the child failed
    #[error("I/O error while running tool: {0}")]
    Io(#[source] io::Error),

    /// The pass exceeded its wall-clock limit; the child was killed
    #[error("Tool did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Arguments for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    /// Whether stdout carries data the caller needs; discarded otherwise
    pub capture_stdout: bool,
}

/// Completed pass: exit status plus everything the tool wrote
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when the child was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Diagnostic stream as text (lossy UTF-8)
    pub fn diagnostic_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Seam between the pipeline and the process that does the analysis
#[async_trait]
pub trait AnalysisTool: Send + Sync {
    /// Run one pass over `input`
    async fn run(&self, invocation: &Invocation, input: &[u8]) -> Result<ToolOutput, ToolError>;
}

/// Runs the analysis tool as a child process
#[derive(Debug, Clone)]
pub struct ProcessTool {
    program: String,
    timeout: Duration,
}

impl ProcessTool {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check that the program can be started at all
    pub async fn is_available(&self) -> bool {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(Duration::from_secs(5), status).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(program = %self.program, error = %e, "Tool availability check failed");
                false
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl AnalysisTool for ProcessTool {
    async fn run(&self, invocation: &Invocation, input: &[u8]) -> Result<ToolOutput, ToolError> {
        let stdout_mode = if invocation.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut child = Command::new(&self.program)
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(stdout_mode)
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        debug!(
            program = %self.program,
            args = ?invocation.args,
            input_bytes = input.len(),
            pid = ?child.id(),
            "Spawned analysis tool"
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let pass = async {
            let (written, out, err) =
                tokio::join!(write_input(stdin, input), drain(stdout), drain(stderr));
            let status = child.wait().await;
            (written, out, err, status)
        };

        let finished = tokio::time::timeout(self.timeout, pass).await;
        let (written, out, err, status) = match finished {
            Ok(finished) => finished,
            Err(_) => {
                warn!(
                    program = %self.program,
                    timeout = ?self.timeout,
                    "Analysis tool timed out, killing"
                );
                if let Err(e) = child.kill().await {
                    warn!(program = %self.program, error = %e, "Failed to kill timed out tool");
                }
                return Err(ToolError::TimedOut(self.timeout));
            }
        };

        // The child has been reaped at this point on every branch below
        let status = status.map_err(ToolError::Io)?;
        let stderr = err.map_err(ToolError::Io)?;

        if let Err(source) = written {
            return Err(ToolError::InputWrite {
                source,
                diagnostic: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }

        let stdout = out.map_err(ToolError::Io)?;

        debug!(
            program = %self.program,
            exit_code = ?status.code(),
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "Analysis tool finished"
        );

        Ok(ToolOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Write the whole buffer, then close stdin so the tool sees EOF
async fn write_input(stdin: Option<ChildStdin>, input: &[u8]) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin not captured"));
    };
    stdin.write_all(input).await?;
    stdin.shutdown().await?;
    Ok(())
}

/// Read a stream to EOF; a stream that was not captured reads as empty
async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

//! Duration recovery from the analysis tool's diagnostic stream
//!
//! The diagnostic text is the tool's incidental log output, not a stable
//! format. Everything that knows its shape lives behind [`DiagnosticParser`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Extracts the decoded audio duration from diagnostic text
pub trait DiagnosticParser: Send + Sync {
    /// Duration in seconds, or `None` if the text reports none
    fn decoded_duration(&self, diagnostic: &str) -> Option<f64>;
}

/// `M:S.fff` in parentheses
static DURATION_NOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+):(\d+)\.(\d+)\)").expect("valid duration regex"));

const FRAMES_DECODED_PREFIX: &str = "Frames decoded:";

/// Parser for audiowaveform's `Frames decoded: N (M:S.fff)` summary line
///
/// Only the first line starting with `Frames decoded:` is considered. The
/// fractional digits are read as a whole number of milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramesDecodedParser;

impl DiagnosticParser for FramesDecodedParser {
    fn decoded_duration(&self, diagnostic: &str) -> Option<f64> {
        let line = diagnostic
            .lines()
            .find(|line| line.starts_with(FRAMES_DECODED_PREFIX))?;
        let caps = DURATION_NOTATION.captures(line)?;

        let minutes: f64 = caps[1].parse().ok()?;
        let seconds: f64 = caps[2].parse().ok()?;
        let millis: f64 = caps[3].parse().ok()?;

        Some(minutes * 60.0 + seconds + millis / 1000.0)
    }
}

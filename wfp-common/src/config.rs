//! Bootstrap configuration and config file discovery
//!
//! Configuration is resolved once at startup and never reloaded:
//! 1. Command-line arguments (highest priority, applied by the service binary)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error: the service starts with compiled
//! defaults. A config file that exists but cannot be
//! parsed or fails validation is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upload size ceiling: 256 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Desired total number of peaks across a whole track, independent of its duration
pub const DEFAULT_TARGET_PEAK_COUNT: u32 = 1500;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// External analysis tool invoked for both passes
pub const DEFAULT_TOOL_PROGRAM: &str = "audiowaveform";

/// Wall-clock limit for a single tool invocation
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "WFP_CONFIG";

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; absent keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Address the HTTP listener binds to
    pub bind_address: Option<String>,

    /// HTTP port
    pub port: Option<u16>,

    /// External analysis tool settings
    pub tool: ToolConfig,

    /// Upload and output limits
    pub limits: LimitsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// External analysis tool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Program name or path
    pub program: String,

    /// Value passed to `--input-format`
    pub input_format: String,

    /// Value passed to `--output-format`
    pub output_format: String,

    /// Bit depth of the peak data pass (8 or 16)
    pub bits: u8,

    /// Per-invocation timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOL_PROGRAM.to_string(),
            input_format: "mp3".to_string(),
            output_format: "json".to_string(),
            bits: 8,
            timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

impl ToolConfig {
    /// Per-invocation timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Upload and output limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: u64,

    /// Total number of peaks requested across the whole track
    pub target_peak_count: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            target_peak_count: DEFAULT_TARGET_PEAK_COUNT,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration if a file was located, otherwise use compiled defaults
    ///
    /// A located path that no longer exists is treated like no file at all.
    /// Reporting which case applied is left to the caller.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.tool.program.trim().is_empty() {
            return Err(Error::Config("tool.program must not be empty".to_string()));
        }
        if self.tool.bits != 8 && self.tool.bits != 16 {
            return Err(Error::Config(format!(
                "tool.bits must be 8 or 16, got {}",
                self.tool.bits
            )));
        }
        if self.tool.timeout_secs == 0 {
            return Err(Error::Config("tool.timeout_secs must be positive".to_string()));
        }
        if self.limits.max_upload_bytes == 0 {
            return Err(Error::Config("limits.max_upload_bytes must be positive".to_string()));
        }
        if self.limits.target_peak_count == 0 {
            return Err(Error::Config("limits.target_peak_count must be positive".to_string()));
        }
        Ok(())
    }
}

/// Locates the TOML config file for a service
///
/// Search order:
/// 1. Explicit path (command line)
/// 2. `WFP_CONFIG` environment variable
/// 3. `<user config dir>/wfp/<module>.toml`
/// 4. `/etc/wfp/<module>.toml` (Linux only)
pub struct ConfigLocator {
    module_name: String,
}

impl ConfigLocator {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// File name searched for in config directories
    pub fn file_name(&self) -> String {
        format!("{}.toml", self.module_name)
    }

    /// Resolve the config file path, if any
    ///
    /// Explicit and environment paths are returned even if they do not exist
    /// so the caller can warn about them; directory candidates are only
    /// returned when present.
    pub fn locate(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        self.candidates().into_iter().find(|p| p.exists())
    }

    /// Platform config locations, in priority order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("wfp").join(self.file_name()));
        }
        if cfg!(target_os = "linux") {
            paths.push(PathBuf::from("/etc/wfp").join(self.file_name()));
        }
        paths
    }
}

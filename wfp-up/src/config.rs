//! Service configuration for wfp-up
//!
//! Resolved once at startup from CLI overrides and the bootstrap TOML, then
//! shared read-only by every request. There is no reload.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use wfp_common::config::{TomlConfig, DEFAULT_BIND_ADDRESS, DEFAULT_PORT};
use wfp_common::{Error, Result};

/// Settings the pipeline needs for every request
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Uploads above this many bytes are rejected before any tool runs
    pub max_upload_bytes: u64,
    /// Total peaks requested across the whole track
    pub target_peak_count: u32,
    /// `--input-format` value
    pub input_format: String,
    /// `--output-format` value
    pub output_format: String,
    /// `--bits` for the data pass
    pub bits: u8,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let toml = TomlConfig::default();
        Self::from_toml(&toml)
    }
}

impl PipelineSettings {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        Self {
            max_upload_bytes: toml.limits.max_upload_bytes,
            target_peak_count: toml.limits.target_peak_count,
            input_format: toml.tool.input_format.clone(),
            output_format: toml.tool.output_format.clone(),
            bits: toml.tool.bits,
        }
    }

    /// Flags shared by both passes: read the whole stream from stdin
    fn common_args(&self) -> Vec<String> {
        vec![
            "--output-format".to_string(),
            self.output_format.clone(),
            "--input-format".to_string(),
            self.input_format.clone(),
            "-i".to_string(),
            "-".to_string(),
        ]
    }

    /// Summary mode: one sample per second, only the diagnostics matter
    pub fn probe_args(&self) -> Vec<String> {
        let mut args = self.common_args();
        args.extend(["--pixels-per-second".to_string(), "1".to_string()]);
        args
    }

    /// Full-resolution mode at the planned density
    pub fn data_args(&self, samples_per_second: u32) -> Vec<String> {
        let mut args = self.common_args();
        args.extend([
            "--bits".to_string(),
            self.bits.to_string(),
            "--amplitude-scale".to_string(),
            "auto".to_string(),
            "--pixels-per-second".to_string(),
            samples_per_second.to_string(),
        ]);
        args
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub tool_program: Option<String>,
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub tool_program: String,
    pub tool_timeout: Duration,
    pub log_level: String,
    pub pipeline: PipelineSettings,
}

impl ServiceConfig {
    /// Combine TOML bootstrap values with CLI overrides
    ///
    /// Priority: CLI (including clap `env` fallbacks) > TOML > compiled defaults
    pub fn resolve(toml: &TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let bind_address = overrides
            .bind_address
            .or_else(|| toml.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let ip: IpAddr = bind_address
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind_address, e)))?;
        let port = overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT);

        let tool_program = overrides
            .tool_program
            .unwrap_or_else(|| toml.tool.program.clone());
        if tool_program.trim().is_empty() {
            return Err(Error::Config("Tool program must not be empty".to_string()));
        }

        Ok(Self {
            listen_addr: SocketAddr::new(ip, port),
            tool_program,
            tool_timeout: toml.tool.timeout(),
            log_level: toml.logging.level.clone(),
            pipeline: PipelineSettings::from_toml(toml),
        })
    }

    /// Default `EnvFilter` directives when `RUST_LOG` is unset
    pub fn log_filter(&self) -> String {
        format!(
            "wfp_up={level},wfp_common={level},tower_http={level}",
            level = self.log_level
        )
    }
}

//! # WFP Common Library
//!
//! Shared code for the waveform-peaks services:
//! - Common error and result types
//! - Bootstrap configuration (TOML) and config file discovery
//! - Compiled defaults for limits and the external analysis tool

pub mod config;
pub mod error;

pub use error::{Error, Result};

//! Configuration module for the cpscan caller layer
//!
//! The engine itself validates nothing. Range sanity and defaults live
//! here, on the caller's side of the [`ScanRequest`] contract.

use crate::network::Protocol;
use crate::output::OutputFormat;
use crate::scanner::{ScanRequest, DEFAULT_TIMEOUT_MS};
use crate::ScanError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_START_PORT: u32 = 1;
pub const DEFAULT_END_PORT: u32 = 1024;
pub const MAX_PORT: u32 = 65535;

/// Main configuration structure for scanning operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// First port of the range (inclusive)
    pub port_start: u32,

    /// Last port of the range (inclusive)
    pub port_end: u32,

    /// Transport protocol to probe with
    pub protocol: Protocol,

    /// Readiness-wait budget per port in milliseconds
    pub timeout_ms: u64,

    /// Show resolution progress, closed ports and per-probe status codes
    pub debug: bool,

    /// Output rendering
    pub format: OutputFormat,

    /// Colourise text output
    pub colored: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            port_start: DEFAULT_START_PORT,
            port_end: DEFAULT_END_PORT,
            protocol: Protocol::Tcp,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            debug: false,
            format: OutputFormat::Text,
            colored: true,
        }
    }
}

impl ScanConfig {
    /// Set the port range
    pub fn with_ports(mut self, port_start: u32, port_end: u32) -> Self {
        self.port_start = port_start;
        self.port_end = port_end;
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the timeout in milliseconds
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ScanError::ConfigError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from `~/.cpscan.toml`, falling back to defaults
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let config_path = home_dir.join(".cpscan.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::debug!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the port range
    pub fn validate(&self) -> crate::Result<()> {
        if self.port_start > self.port_end {
            return Err(ScanError::PortRangeError(format!(
                "StartPort ({}) cannot be greater than EndPort ({})",
                self.port_start, self.port_end
            )));
        }

        if self.port_end > MAX_PORT {
            return Err(ScanError::PortRangeError(format!(
                "EndPort ({}) You may not scan ports greater than {}",
                self.port_end, MAX_PORT
            )));
        }

        Ok(())
    }

    /// Validate and build the engine's request for `target`
    pub fn to_request(&self, target: impl Into<String>) -> crate::Result<ScanRequest> {
        self.validate()?;

        // validate() bounds both ends by MAX_PORT
        let port_start = u16::try_from(self.port_start)
            .map_err(|_| ScanError::PortRangeError(format!("invalid start port {}", self.port_start)))?;
        let port_end = u16::try_from(self.port_end)
            .map_err(|_| ScanError::PortRangeError(format!("invalid end port {}", self.port_end)))?;

        Ok(ScanRequest::new(target, port_start, port_end)
            .with_protocol(self.protocol)
            .with_timeout(self.timeout_ms)
            .with_debug(self.debug))
    }
}

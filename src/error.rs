//! Error handling for the cpscan probe engine
//!
//! Scan-fatal conditions (resolution, caller-side validation) are
//! [`ScanError`]s. Per-port socket failures are [`ProbeError`]s: they are
//! logged and folded into the port's outcome and never abort a scan.

use std::io;
use thiserror::Error;

/// Main error type for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Resolution error: empty query")]
    EmptyQuery,

    #[error("Resolution error: no IPv4 address record for {0}")]
    NoAddressRecord(String),

    #[error("Resolution error: lookup for {name} failed: {source}")]
    LookupFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Port range error: {0}")]
    PortRangeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ScanError {
    /// True for the errors that make a scan produce zero outcomes
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            ScanError::EmptyQuery | ScanError::NoAddressRecord(_) | ScanError::LookupFailed { .. }
        )
    }

    /// Native error code of a failed lookup, for diagnostics
    pub fn os_code(&self) -> Option<i32> {
        match self {
            ScanError::LookupFailed { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Failures that end a single probe before the connection attempt
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("INVALID SOCKET: {0}")]
    SocketCreation(#[source] io::Error),

    #[error("failed to switch socket to non-blocking mode: {0}")]
    SocketMode(#[source] io::Error),
}

//! Scanner module containing the probe state machine and the scan engine

pub mod engine;
pub mod probe;

use crate::network::{PortStatus, ProbeOutcome, Protocol};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

pub use engine::{PortScan, ScanEngine};
pub use probe::{Prober, ProbeState, RetryBudget};

/// Timeout substituted when the caller asks for 1 ms or less
pub const DEFAULT_TIMEOUT_MS: u64 = 200;

/// Convert a caller timeout in milliseconds into the prober's microseconds
pub fn normalize_timeout(timeout_ms: u64) -> u64 {
    if timeout_ms <= 1 {
        DEFAULT_TIMEOUT_MS * 1000
    } else {
        timeout_ms.saturating_mul(1000)
    }
}

/// Parameters of one scan, supplied by the caller already validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Domain name or IPv4 literal
    pub target: String,
    pub port_start: u16,
    pub port_end: u16,
    pub protocol: Protocol,
    /// Readiness-wait budget per port, in milliseconds
    pub timeout_ms: u64,
    pub debug: bool,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>, port_start: u16, port_end: u16) -> Self {
        Self {
            target: target.into(),
            port_start,
            port_end,
            protocol: Protocol::Tcp,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            debug: false,
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The closed port range, ascending
    pub fn ports(&self) -> RangeInclusive<u16> {
        self.port_start..=self.port_end
    }

    /// Number of ports the scan will probe
    pub fn port_count(&self) -> usize {
        if self.port_start > self.port_end {
            0
        } else {
            (self.port_end - self.port_start) as usize + 1
        }
    }

    /// Timeout handed to the prober, in microseconds
    pub fn timeout_micros(&self) -> u64 {
        normalize_timeout(self.timeout_ms)
    }
}

/// Tally of a consumed outcome stream
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub open: usize,
    pub closed: usize,
    pub errors: usize,
    started: Instant,
    duration: Duration,
}

impl ScanSummary {
    pub fn new() -> Self {
        Self {
            open: 0,
            closed: 0,
            errors: 0,
            started: Instant::now(),
            duration: Duration::from_secs(0),
        }
    }

    pub fn record(&mut self, outcome: &ProbeOutcome) {
        match outcome.status {
            PortStatus::Open => self.open += 1,
            PortStatus::Closed => self.closed += 1,
            PortStatus::Error => self.errors += 1,
        }
        self.duration = self.started.elapsed();
    }

    pub fn total(&self) -> usize {
        self.open + self.closed + self.errors
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for ScanSummary {
    fn default() -> Self {
        Self::new()
    }
}

//! Network module: transport protocol, per-port outcomes, name resolution
//! and the socket transport used by the prober

pub mod resolver;
pub mod socket;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use resolver::{Resolve, ResolvedTarget, SystemResolver};
pub use socket::{ConnectStatus, Readiness, SystemTransport, Transport};

/// Transport protocol used for a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Tcp
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            _ => Err(format!("Unknown protocol: {}", s)),
        }
    }
}

/// Classification of one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Open,
    Closed,
    Error,
}

impl PortStatus {
    /// Per-probe status code: 0 when the port answered, 1 otherwise
    pub fn status_code(&self) -> u8 {
        match self {
            PortStatus::Open => 0,
            PortStatus::Closed | PortStatus::Error => 1,
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Open => write!(f, "OPEN"),
            PortStatus::Closed => write!(f, "CLOSED"),
            PortStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of one port attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub port: u16,
    pub status: PortStatus,
    pub protocol: Protocol,
}

impl ProbeOutcome {
    pub fn new(port: u16, protocol: Protocol, status: PortStatus) -> Self {
        Self {
            port,
            status,
            protocol,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PortStatus::Open
    }
}

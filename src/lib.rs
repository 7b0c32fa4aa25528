//! cpscan - a sequential connect-based port probe engine
//!
//! Resolves a target to IPv4 once, then probes a closed port range one
//! port at a time with a non-blocking connect, a bounded readiness wait
//! and a bounded re-check loop.

pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;

// Re-export commonly used types
pub use config::ScanConfig;
pub use error::{ProbeError, ScanError};
pub use network::{PortStatus, ProbeOutcome, Protocol, Resolve, ResolvedTarget, SystemResolver, SystemTransport, Transport};
pub use scanner::{engine::ScanEngine, PortScan, Prober, ScanRequest, ScanSummary};

pub type Result<T> = std::result::Result<T, ScanError>;

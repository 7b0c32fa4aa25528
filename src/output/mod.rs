//! Output formatting for the outcome stream
//!
//! The engine hands out [`ProbeOutcome`]s; everything user-visible is
//! decided here. Text output follows the classic line format
//! (`OPEN [80]`, `CLOSED [79]`), JSON output writes one object per line.

use crate::network::{PortStatus, ProbeOutcome, ResolvedTarget};
use crate::scanner::ScanSummary;
use colored::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
    pub debug: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            colored: false,
            debug: false,
        }
    }
}

/// Renders scan progress and outcomes
#[derive(Debug, Clone)]
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    fn is_text(&self) -> bool {
        self.config.format == OutputFormat::Text
    }

    pub fn resolving_line(&self) -> Option<String> {
        (self.is_text() && self.config.debug).then(|| "Resolving domain name".to_string())
    }

    pub fn resolved_line(&self, target: &ResolvedTarget) -> Option<String> {
        (self.is_text() && self.config.debug).then(|| format!("Name resolved [{}]", target.address_string()))
    }

    /// Text lines for one outcome. Open and Error ports are always shown,
    /// Closed ports and status codes only in debug mode.
    pub fn render_outcome(&self, outcome: &ProbeOutcome) -> Vec<String> {
        let mut lines = Vec::new();
        let label = format!("{} [{}]", outcome.status, outcome.port);

        match outcome.status {
            PortStatus::Open | PortStatus::Error => lines.push(self.paint(label, outcome.status)),
            PortStatus::Closed if self.config.debug => lines.push(self.paint(label, outcome.status)),
            PortStatus::Closed => {}
        }

        if self.config.debug {
            lines.push(format!("Probe status [{}]", outcome.status.status_code()));
        }
        lines
    }

    /// Printed on stdout when the target cannot be resolved, in every format
    pub fn resolution_failure_line(&self) -> String {
        "Error: Unable to resolve domain. Make sure it is spelt correctly.".to_string()
    }

    pub fn summary_line(&self, summary: &ScanSummary) -> Option<String> {
        (self.is_text() && self.config.debug).then(|| {
            format!(
                "Scanned {} port(s) in {:.2}s: {} open, {} closed, {} error(s)",
                summary.total(),
                summary.duration().as_secs_f64(),
                summary.open,
                summary.closed,
                summary.errors
            )
        })
    }

    /// Write one outcome in the configured format
    pub fn write_outcome<W: Write>(&self, out: &mut W, outcome: &ProbeOutcome) -> io::Result<()> {
        match self.config.format {
            OutputFormat::Text => {
                for line in self.render_outcome(outcome) {
                    writeln!(out, "{}", line)?;
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, outcome)?;
                writeln!(out)?;
            }
        }
        out.flush()
    }

    pub fn write_line<W: Write>(&self, out: &mut W, line: Option<String>) -> io::Result<()> {
        match line {
            Some(line) => writeln!(out, "{}", line),
            None => Ok(()),
        }
    }

    fn paint(&self, label: String, status: PortStatus) -> String {
        if !self.config.colored {
            return label;
        }
        match status {
            PortStatus::Open => label.bright_green().bold().to_string(),
            PortStatus::Closed => label.dimmed().to_string(),
            PortStatus::Error => label.bright_red().to_string(),
        }
    }
}

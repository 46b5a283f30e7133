//! The probes and the result shape they share.
//!
//! Each probe is an async function that takes the config and a
//! [`NetEngine`](crate::engine::NetEngine) and always yields exactly one
//! [`ProbeResult`]. Errors from the engine are folded into the status and
//! detail; nothing propagates out of a probe.

pub mod captive;
pub mod edge;
pub mod mesh;
pub mod nameserver;
pub mod proxy;
pub mod route;

use crate::{engine::PingStats, util::round_millis};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Reachable,
    /// Partial success, e.g. ICMP blocked while DNS answers.
    Degraded,
    Unreachable,
    /// Could not be determined. Never folded into `Unreachable`.
    Indeterminate,
}

impl Status {
    pub fn glyph(self) -> &'static str {
        match self {
            Status::Reachable => "[+]",
            Status::Degraded => "[~]",
            Status::Unreachable | Status::Indeterminate => "[!]",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Reachable => "reachable",
            Status::Degraded => "degraded",
            Status::Unreachable => "unreachable",
            Status::Indeterminate => "indeterminate",
        };
        f.write_str(s)
    }
}

/// Round-trip summary, rounded to whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min_ms: u64,
    pub avg_ms: u64,
    pub max_ms: u64,
}

impl From<&PingStats> for LatencyStats {
    fn from(s: &PingStats) -> Self {
        Self {
            min_ms: round_millis(s.min),
            avg_ms: round_millis(s.avg),
            max_ms: round_millis(s.max),
        }
    }
}

impl fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms/{}ms/{}ms", self.min_ms, self.avg_ms, self.max_ms)
    }
}

/// One probe's verdict. Fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    name: String,
    status: Status,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency: Option<LatencyStats>,
}

impl ProbeResult {
    pub fn new(name: impl Into<String>, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
            latency: None,
        }
    }

    pub fn reachable(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Status::Reachable, detail)
    }

    pub fn degraded(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Status::Degraded, detail)
    }

    pub fn unreachable(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Status::Unreachable, detail)
    }

    pub fn indeterminate(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Status::Indeterminate, detail)
    }

    pub fn with_latency(mut self, latency: Option<LatencyStats>) -> Self {
        self.latency = latency;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn latency(&self) -> Option<&LatencyStats> {
        self.latency.as_ref()
    }
}

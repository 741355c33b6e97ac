// src/health/status.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a health check.
///
/// `Unknown` only describes the absence of results (an empty composite, a
/// check that has not run yet). A completed check never reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckStatus {
    #[default]
    Unknown,
    Healthy,
    Warning,
    Unhealthy,
}

impl CheckStatus {
    pub const ALL: [CheckStatus; 4] = [
        CheckStatus::Unknown,
        CheckStatus::Healthy,
        CheckStatus::Warning,
        CheckStatus::Unhealthy,
    ];

    pub fn is_healthy(self) -> bool {
        self == CheckStatus::Healthy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Unknown => "Unknown",
            CheckStatus::Healthy => "Healthy",
            CheckStatus::Warning => "Warning",
            CheckStatus::Unhealthy => "Unhealthy",
        }
    }

    /// Gauge encoding used by the metrics collector.
    pub fn metric_value(self) -> i64 {
        match self {
            CheckStatus::Unknown => 0,
            CheckStatus::Healthy => 1,
            CheckStatus::Warning => 2,
            CheckStatus::Unhealthy => 3,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

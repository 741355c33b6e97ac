// src/metrics/collector.rs
use crate::health::{CheckStatus, CompositeHealthCheckResult};
use anyhow::{Context, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    pub check_runs_total: IntCounterVec,
    pub check_duration_seconds: Histogram,
    pub overall_status: IntGauge,
    pub child_status: IntGaugeVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let check_runs_total = IntCounterVec::new(
            Opts::new(
                "healthgate_check_runs_total",
                "Total health check runs by overall status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(check_runs_total.clone()))?;

        let check_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "healthgate_check_duration_seconds",
            "Duration of a full health check run in seconds",
        ))?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let overall_status = IntGauge::new(
            "healthgate_overall_status",
            "Overall status of the last run (0=unknown, 1=healthy, 2=warning, 3=unhealthy)",
        )?;
        registry.register(Box::new(overall_status.clone()))?;

        let child_status = IntGaugeVec::new(
            Opts::new(
                "healthgate_child_status",
                "Status of each top-level check in the last run",
            ),
            &["check"],
        )?;
        registry.register(Box::new(child_status.clone()))?;

        Ok(Self {
            check_runs_total,
            check_duration_seconds,
            overall_status,
            child_status,
        })
    }

    pub fn record_run(&self, result: &CompositeHealthCheckResult, duration: Duration) {
        let status = result.status();
        self.check_runs_total
            .with_label_values(&[status.as_str()])
            .inc();
        self.check_duration_seconds.observe(duration.as_secs_f64());
        self.overall_status.set(status.metric_value());

        for (name, child) in result.results() {
            self.update_child_status(name, child.status());
        }
    }

    pub fn update_child_status(&self, check: &str, status: CheckStatus) {
        self.child_status
            .with_label_values(&[check])
            .set(status.metric_value());
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

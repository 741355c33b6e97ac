// src/health/service.rs
use super::builder::HealthCheckBuilder;
use super::executor::run_checks;
use super::resolver::{NoopResolver, ProbeResolver};
use super::{CheckStatus, CompositeHealthCheckResult};
use crate::metrics::{MetricsCollector, Timer};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Runs the registered checks on demand.
///
/// The registry is fixed once the builder is handed over; results come from
/// each check's cache when it is still fresh.
pub struct HealthCheckService {
    registry: HealthCheckBuilder,
    resolver: Arc<dyn ProbeResolver>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthCheckService {
    pub fn new(registry: HealthCheckBuilder) -> Self {
        Self::with_resolver(registry, Arc::new(NoopResolver))
    }

    pub fn with_resolver(registry: HealthCheckBuilder, resolver: Arc<dyn ProbeResolver>) -> Self {
        Self {
            registry,
            resolver,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &HealthCheckBuilder {
        &self.registry
    }

    /// Runs every top-level check, merging with the root group's
    /// partial-success status.
    pub async fn check_health(&self, cancel: &CancellationToken) -> CompositeHealthCheckResult {
        self.check_health_with(cancel, None).await
    }

    pub async fn check_health_with(
        &self,
        cancel: &CancellationToken,
        partially_healthy_status: Option<CheckStatus>,
    ) -> CompositeHealthCheckResult {
        let root = self.registry.root_group();
        let status = partially_healthy_status.unwrap_or_else(|| root.partially_healthy_status());
        let span = info_span!("check_health", run_id = %Uuid::new_v4());

        async move {
            if self.registry.is_empty() {
                warn!("No health checks registered");
                return CompositeHealthCheckResult::new(status);
            }

            let timer = Timer::new();
            let result = run_checks(
                root.checks().to_vec(),
                status,
                self.resolver.clone(),
                cancel.child_token(),
            )
            .await;

            log_result(&result);
            if let Some(metrics) = &self.metrics {
                metrics.record_run(&result, timer.elapsed());
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Like [`check_health`](Self::check_health), cancelling the run once
    /// `timeout` has elapsed.
    pub async fn check_health_with_timeout(&self, timeout: Duration) -> CompositeHealthCheckResult {
        let cancel = CancellationToken::new();
        let run = self.check_health(&cancel);
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => result,
            _ = tokio::time::sleep(timeout) => {
                warn!("Health check run exceeded {:?}, cancelling", timeout);
                cancel.cancel();
                run.await
            }
        }
    }

    /// Runs only the members of one named group. Returns `None` for unknown
    /// group names.
    pub async fn check_group(
        &self,
        group_name: &str,
        cancel: &CancellationToken,
    ) -> Option<CompositeHealthCheckResult> {
        let group = self.registry.group(group_name)?;
        if group.is_root() {
            return Some(self.check_health(cancel).await);
        }

        let span = info_span!("check_group", group = %group.name(), run_id = %Uuid::new_v4());
        let result = run_checks(
            group.checks().to_vec(),
            group.partially_healthy_status(),
            self.resolver.clone(),
            cancel.child_token(),
        )
        .instrument(span.clone())
        .await;

        span.in_scope(|| log_result(&result));
        Some(result)
    }
}

fn log_result(result: &CompositeHealthCheckResult) {
    let lines = result
        .results()
        .map(|(name, child)| format!("{}: {}: {}", name, child.status(), child.description()))
        .collect::<Vec<_>>()
        .join("\n");

    if result.status().is_healthy() {
        info!("Health check status: {}\n{}", result.status(), lines);
    } else {
        error!("Health check status: {}\n{}", result.status(), lines);
    }
}

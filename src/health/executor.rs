// src/health/executor.rs
use super::cached::CachedCheck;
use super::check::ProbeResult;
use super::resolver::ProbeResolver;
use super::result::{CheckResult, HealthCheckResult};
use super::{CheckStatus, CompositeHealthCheckResult};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const BLANK_DESCRIPTION: &str = "The health check returned a blank description";

/// Runs one probe so that nothing it does can escape as an error.
///
/// Cancellation (before or during the run) yields the timed-out result and
/// errors or panics yield an exception result. A result with status
/// `Unknown` or a blank description is reported unhealthy. Anything else is
/// passed through unchanged.
pub async fn run_guarded<F>(probe: F, cancel: &CancellationToken) -> CheckResult
where
    F: Future<Output = ProbeResult> + Send,
{
    if cancel.is_cancelled() {
        return HealthCheckResult::timed_out().into();
    }

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return HealthCheckResult::timed_out().into(),
        outcome = AssertUnwindSafe(probe).catch_unwind() => outcome,
    };

    match outcome {
        Ok(Ok(result)) if result.status() == CheckStatus::Unknown => {
            warn!("Health check reported status 'Unknown', treating it as unhealthy");
            HealthCheckResult::unhealthy("The health check reported status 'Unknown'").into()
        }
        Ok(Ok(CheckResult::Single(result))) if result.has_blank_description() => {
            warn!("Health check returned a blank description, treating it as unhealthy");
            HealthCheckResult::unhealthy(BLANK_DESCRIPTION).into()
        }
        Ok(Ok(result)) => result,
        Ok(Err(err)) if err.is_cancelled() => HealthCheckResult::timed_out().into(),
        Ok(Err(err)) => {
            debug!("Health check failed: {}", err);
            HealthCheckResult::exception(err.kind()).into()
        }
        Err(_) => HealthCheckResult::exception("panic").into(),
    }
}

/// Runs every check concurrently and merges the results.
///
/// Results are recorded in the order of `checks`, whatever order the runs
/// finish in. Boxed because group checks call back into it.
pub fn run_checks(
    checks: Vec<Arc<CachedCheck>>,
    partially_healthy_status: CheckStatus,
    resolver: Arc<dyn ProbeResolver>,
    cancel: CancellationToken,
) -> BoxFuture<'static, CompositeHealthCheckResult> {
    async move {
        let tasks = checks
            .iter()
            .map(|check| {
                let check = check.clone();
                let resolver = resolver.clone();
                let cancel = cancel.child_token();
                tokio::spawn(async move { check.run(&resolver, &cancel).await })
            })
            .collect::<Vec<_>>();

        let outcomes = join_all(tasks).await;

        let mut composite = CompositeHealthCheckResult::new(partially_healthy_status);
        for (check, outcome) in checks.iter().zip(outcomes) {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!("Health check task '{}' failed: {}", check.name(), e);
                    let result = if e.is_cancelled() {
                        HealthCheckResult::timed_out()
                    } else {
                        HealthCheckResult::exception("panic")
                    };
                    Arc::new(result.into())
                }
            };

            if let Err(e) = composite.add(check.name(), result) {
                error!("Dropping result of health check '{}': {}", check.name(), e);
            }
        }

        composite
    }
    .boxed()
}

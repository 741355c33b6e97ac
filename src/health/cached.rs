// src/health/cached.rs
use super::check::{HealthCheck, ProbeError, ProbeResult};
use super::error::{require_name, HealthCheckError};
use super::executor::{run_checks, run_guarded};
use super::resolver::{ProbeDescriptor, ProbeResolver, ResolveError};
use super::result::{CheckResult, HealthCheckResult};
use super::CheckStatus;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How long a caller that lost the refresh race waits before looking again.
const WRITER_BACKOFF: Duration = Duration::from_millis(5);

pub(crate) enum ProbeSource {
    Instance(Arc<dyn HealthCheck>),
    Descriptor(ProbeDescriptor),
    Group {
        members: Vec<Arc<CachedCheck>>,
        partially_healthy_status: CheckStatus,
    },
}

struct CacheEntry {
    result: Arc<CheckResult>,
    expires_at: Instant,
    refreshed_at: DateTime<Utc>,
}

/// A registered check together with its cached result.
///
/// Fresh results are served without suspending. Once the entry is stale,
/// exactly one caller re-runs the probe while the others wait for the
/// published result.
pub struct CachedCheck {
    name: String,
    cache_duration: Duration,
    source: ProbeSource,
    entry: ArcSwapOption<CacheEntry>,
    refreshing: AtomicBool,
}

impl CachedCheck {
    pub fn new(
        name: impl Into<String>,
        check: Arc<dyn HealthCheck>,
        cache_duration: Duration,
    ) -> Result<Self, HealthCheckError> {
        Self::with_source(name.into(), ProbeSource::Instance(check), cache_duration)
    }

    pub fn from_descriptor(
        name: impl Into<String>,
        descriptor: ProbeDescriptor,
        cache_duration: Duration,
    ) -> Result<Self, HealthCheckError> {
        Self::with_source(name.into(), ProbeSource::Descriptor(descriptor), cache_duration)
    }

    /// Group checks re-merge their members on every run; the members carry
    /// their own caches.
    pub(crate) fn group(
        name: String,
        members: Vec<Arc<CachedCheck>>,
        partially_healthy_status: CheckStatus,
    ) -> Result<Self, HealthCheckError> {
        Self::with_source(
            name,
            ProbeSource::Group {
                members,
                partially_healthy_status,
            },
            Duration::ZERO,
        )
    }

    fn with_source(
        name: String,
        source: ProbeSource,
        cache_duration: Duration,
    ) -> Result<Self, HealthCheckError> {
        require_name("name", &name)?;
        Ok(Self {
            name,
            cache_duration,
            source,
            entry: ArcSwapOption::empty(),
            refreshing: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache_duration(&self) -> Duration {
        self.cache_duration
    }

    pub fn is_group(&self) -> bool {
        matches!(self.source, ProbeSource::Group { .. })
    }

    pub fn cached_result(&self) -> Option<Arc<CheckResult>> {
        self.entry.load_full().map(|entry| entry.result.clone())
    }

    pub fn cache_expiration(&self) -> Option<Instant> {
        self.entry.load_full().map(|entry| entry.expires_at)
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.entry.load_full().map(|entry| entry.refreshed_at)
    }

    pub async fn run(
        &self,
        resolver: &Arc<dyn ProbeResolver>,
        cancel: &CancellationToken,
    ) -> Arc<CheckResult> {
        loop {
            if let Some(result) = self.fresh_result() {
                return result;
            }

            if self
                .refreshing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Arc::new(HealthCheckResult::timed_out().into());
                    }
                    _ = sleep(WRITER_BACKOFF) => continue,
                }
            }

            let _writer = WriterGuard(&self.refreshing);

            // A previous writer may have published between the staleness
            // check above and acquiring the flag.
            if let Some(result) = self.fresh_result() {
                return result;
            }

            let result = Arc::new(self.execute(resolver, cancel).await);
            self.entry.store(Some(Arc::new(CacheEntry {
                result: result.clone(),
                expires_at: Instant::now() + self.cache_duration,
                refreshed_at: Utc::now(),
            })));

            debug!(
                "Refreshed health check '{}': {} (cached for {:?})",
                self.name,
                result.status(),
                self.cache_duration
            );
            return result;
        }
    }

    fn fresh_result(&self) -> Option<Arc<CheckResult>> {
        self.entry
            .load_full()
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.result.clone())
    }

    async fn execute(
        &self,
        resolver: &Arc<dyn ProbeResolver>,
        cancel: &CancellationToken,
    ) -> CheckResult {
        match &self.source {
            ProbeSource::Instance(check) => run_guarded(check.check(cancel), cancel).await,
            ProbeSource::Descriptor(descriptor) => match resolver.resolve(descriptor) {
                Some(check) => run_guarded(check.check(cancel), cancel).await,
                None => {
                    let err = ProbeError::from(ResolveError {
                        descriptor: descriptor.clone(),
                    });
                    run_guarded(futures::future::ready(ProbeResult::Err(err)), cancel).await
                }
            },
            ProbeSource::Group {
                members,
                partially_healthy_status,
            } => {
                let merged = run_checks(
                    members.clone(),
                    *partially_healthy_status,
                    resolver.clone(),
                    cancel.clone(),
                );
                run_guarded(
                    async move { ProbeResult::Ok(CheckResult::Composite(merged.await)) },
                    cancel,
                )
                .await
            }
        }
    }
}

impl fmt::Debug for CachedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCheck")
            .field("name", &self.name)
            .field("cache_duration", &self.cache_duration)
            .field("is_group", &self.is_group())
            .finish()
    }
}

/// Releases the writer flag even when the refreshing future is dropped.
struct WriterGuard<'a>(&'a AtomicBool);

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

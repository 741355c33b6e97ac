// src/health/builder.rs
use super::cached::CachedCheck;
use super::check::{FnCheck, HealthCheck, ProbeResult};
use super::error::{require_name, require_partial_status, HealthCheckError};
use super::resolver::ProbeDescriptor;
use super::result::CheckResult;
use super::CheckStatus;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Name of the implicit top-level group.
pub const ROOT_GROUP: &str = "";

pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(5 * 60);

/// Partial-success status used by [`HealthCheckBuilder::add_default_group`].
pub const DEFAULT_GROUP_STATUS: CheckStatus = CheckStatus::Warning;

/// A named set of checks merged with its own partial-success status.
#[derive(Debug, Clone)]
pub struct HealthCheckGroup {
    name: String,
    checks: Vec<Arc<CachedCheck>>,
    partially_healthy_status: CheckStatus,
}

impl HealthCheckGroup {
    fn new(name: impl Into<String>, partially_healthy_status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            checks: Vec::new(),
            partially_healthy_status,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checks(&self) -> &[Arc<CachedCheck>] {
        &self.checks
    }

    pub fn partially_healthy_status(&self) -> CheckStatus {
        self.partially_healthy_status
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_GROUP
    }
}

/// Registers checks and groups at startup.
///
/// Check names share one flat, case-insensitive namespace across all groups.
/// Groups are one level deep: inside the closure given to [`add_group`],
/// further `add_group` calls fail.
///
/// [`add_group`]: HealthCheckBuilder::add_group
#[derive(Debug)]
pub struct HealthCheckBuilder {
    checks_by_name: HashMap<String, Arc<CachedCheck>>,
    groups: Vec<HealthCheckGroup>,
    current_group: usize,
    default_cache_duration: Duration,
}

impl Default for HealthCheckBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthCheckBuilder {
    pub fn new() -> Self {
        Self {
            checks_by_name: HashMap::new(),
            groups: vec![HealthCheckGroup::new(ROOT_GROUP, CheckStatus::Unhealthy)],
            current_group: 0,
            default_cache_duration: DEFAULT_CACHE_DURATION,
        }
    }

    pub fn default_cache_duration(&self) -> Duration {
        self.default_cache_duration
    }

    /// Inside [`add_group`](Self::add_group) the new default only applies to
    /// the rest of that group's configuration.
    pub fn with_default_cache_duration(&mut self, duration: Duration) -> &mut Self {
        self.default_cache_duration = duration;
        self
    }

    /// Sets the partial-success status of the group being configured (the
    /// root group outside of [`add_group`](Self::add_group)).
    pub fn with_partial_success_status(
        &mut self,
        status: CheckStatus,
    ) -> Result<&mut Self, HealthCheckError> {
        require_partial_status("partial_success_status", status)?;
        self.groups[self.current_group].partially_healthy_status = status;
        Ok(self)
    }

    pub fn add_check<C>(&mut self, name: &str, check: C) -> Result<&mut Self, HealthCheckError>
    where
        C: HealthCheck + 'static,
    {
        let duration = self.default_cache_duration;
        self.add_shared_check(name, Arc::new(check), duration)
    }

    pub fn add_check_with_duration<C>(
        &mut self,
        name: &str,
        check: C,
        cache_duration: Duration,
    ) -> Result<&mut Self, HealthCheckError>
    where
        C: HealthCheck + 'static,
    {
        self.add_shared_check(name, Arc::new(check), cache_duration)
    }

    pub fn add_shared_check(
        &mut self,
        name: &str,
        check: Arc<dyn HealthCheck>,
        cache_duration: Duration,
    ) -> Result<&mut Self, HealthCheckError> {
        let cached = CachedCheck::new(name, check, cache_duration)?;
        self.register(cached)
    }

    /// Registers a synchronous closure as a check.
    pub fn add_check_fn<F, R>(&mut self, name: &str, f: F) -> Result<&mut Self, HealthCheckError>
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<CheckResult>,
    {
        self.add_check(name, FnCheck::new(f))
    }

    /// Registers an asynchronous closure as a check.
    pub fn add_async_check_fn<F, Fut>(
        &mut self,
        name: &str,
        f: F,
    ) -> Result<&mut Self, HealthCheckError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProbeResult> + Send + 'static,
    {
        self.add_check(name, FnCheck::from_async_fn(f))
    }

    /// Registers a check whose instance is resolved when it runs.
    pub fn add_check_by_descriptor(
        &mut self,
        name: &str,
        descriptor: ProbeDescriptor,
        cache_duration: Duration,
    ) -> Result<&mut Self, HealthCheckError> {
        let cached = CachedCheck::from_descriptor(name, descriptor, cache_duration)?;
        self.register(cached)
    }

    pub fn add_check_by_type<C>(&mut self, name: &str) -> Result<&mut Self, HealthCheckError>
    where
        C: HealthCheck + 'static,
    {
        let duration = self.default_cache_duration;
        self.add_check_by_descriptor(name, ProbeDescriptor::of::<C>(), duration)
    }

    /// Adds a group configured by `configure` and registers it in the root
    /// group as a single check named `Group({group_name})`.
    ///
    /// `configure` starts from the builder's default cache duration; changes
    /// it makes to that default end with the group. If configuration fails,
    /// every check it registered is removed again.
    pub fn add_group<F>(
        &mut self,
        group_name: &str,
        partially_healthy_status: CheckStatus,
        configure: F,
    ) -> Result<&mut Self, HealthCheckError>
    where
        F: FnOnce(&mut HealthCheckBuilder) -> Result<(), HealthCheckError>,
    {
        if self.current_group != 0 {
            return Err(HealthCheckError::UnsupportedOperation(
                "Nested groups are not supported by HealthCheckBuilder.".to_string(),
            ));
        }
        require_name("group_name", group_name)?;
        require_partial_status("partial_success_status", partially_healthy_status)?;
        if self.group(group_name).is_some() {
            return Err(HealthCheckError::duplicate_group(group_name));
        }

        self.groups
            .push(HealthCheckGroup::new(group_name, partially_healthy_status));
        self.current_group = self.groups.len() - 1;
        let outer_cache_duration = self.default_cache_duration;
        let configured = configure(self);
        self.current_group = 0;
        self.default_cache_duration = outer_cache_duration;

        let configured = configured.and_then(|()| {
            let group = &self.groups[self.groups.len() - 1];
            if group.checks.is_empty() {
                return Err(HealthCheckError::invalid(
                    "group_checks",
                    format!("Group '{}' must contain at least one check.", group_name),
                ));
            }
            CachedCheck::group(
                format!("Group({})", group_name),
                group.checks.clone(),
                group.partially_healthy_status,
            )
        });

        let synthetic = match configured {
            Ok(synthetic) => synthetic,
            Err(e) => {
                self.discard_last_group();
                return Err(e);
            }
        };

        if let Err(e) = self.register(synthetic) {
            self.discard_last_group();
            return Err(e);
        }

        debug!("Registered health check group '{}'", group_name);
        Ok(self)
    }

    /// [`add_group`](Self::add_group) with the [`DEFAULT_GROUP_STATUS`].
    pub fn add_default_group<F>(
        &mut self,
        group_name: &str,
        configure: F,
    ) -> Result<&mut Self, HealthCheckError>
    where
        F: FnOnce(&mut HealthCheckBuilder) -> Result<(), HealthCheckError>,
    {
        self.add_group(group_name, DEFAULT_GROUP_STATUS, configure)
    }

    fn register(&mut self, check: CachedCheck) -> Result<&mut Self, HealthCheckError> {
        let key = check.name().to_lowercase();
        if self.checks_by_name.contains_key(&key) {
            return Err(HealthCheckError::duplicate_check(check.name()));
        }

        let check = Arc::new(check);
        self.checks_by_name.insert(key, check.clone());
        self.groups[self.current_group].checks.push(check);
        Ok(self)
    }

    fn discard_last_group(&mut self) {
        if let Some(group) = self.groups.pop() {
            for check in group.checks {
                self.checks_by_name.remove(&check.name().to_lowercase());
            }
        }
    }

    pub fn check(&self, name: &str) -> Option<&Arc<CachedCheck>> {
        self.checks_by_name.get(&name.to_lowercase())
    }

    pub fn checks_by_name(&self) -> impl Iterator<Item = &Arc<CachedCheck>> {
        self.checks_by_name.values()
    }

    pub fn len(&self) -> usize {
        self.checks_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks_by_name.is_empty()
    }

    /// All groups, root first, in registration order.
    pub fn groups(&self) -> &[HealthCheckGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&HealthCheckGroup> {
        let wanted = name.to_lowercase();
        self.groups
            .iter()
            .find(|group| group.name.to_lowercase() == wanted)
    }

    pub fn root_group(&self) -> &HealthCheckGroup {
        &self.groups[0]
    }
}

// src/health/mod.rs
mod builder;
mod cached;
mod check;
mod composite;
mod error;
mod executor;
mod resolver;
mod result;
mod service;
mod status;

pub use builder::{
    HealthCheckBuilder, HealthCheckGroup, DEFAULT_CACHE_DURATION, DEFAULT_GROUP_STATUS, ROOT_GROUP,
};
pub use cached::CachedCheck;
pub use check::{FnCheck, HealthCheck, ProbeError, ProbeResult};
pub use composite::CompositeHealthCheckResult;
pub use error::{cache_duration_from_millis, HealthCheckError};
pub use executor::{run_checks, run_guarded};
pub use resolver::{NoopResolver, ProbeDescriptor, ProbeResolver, ResolveError, ServiceResolver};
pub use result::{CheckData, CheckResult, HealthCheckResult, TIMED_OUT_DESCRIPTION};
pub use service::HealthCheckService;
pub use status::CheckStatus;

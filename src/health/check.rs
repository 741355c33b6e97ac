// src/health/check.rs
use super::result::CheckResult;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::any::{type_name, TypeId};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub type ProbeResult = Result<CheckResult, ProbeError>;

/// A unit of health evaluation.
///
/// Implementations should observe `cancel` around long I/O. Errors and panics
/// never escape a run: the execution guard turns them into unhealthy results.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, cancel: &CancellationToken) -> ProbeResult;
}

/// Failure of a probe.
///
/// Any `std::error::Error` converts into it with `?`; the concrete type name
/// is kept so the unhealthy result can say which kind of error occurred.
pub struct ProbeError {
    repr: Repr,
}

enum Repr {
    Cancelled,
    Failed {
        kind: &'static str,
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ProbeError {
    pub fn cancelled() -> Self {
        Self {
            repr: Repr::Cancelled,
        }
    }

    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            repr: Repr::Failed {
                kind: type_name::<ProbeError>(),
                source: message.to_string().into(),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.repr, Repr::Cancelled)
    }

    /// Fully qualified type name of the underlying error.
    pub fn kind(&self) -> &'static str {
        match &self.repr {
            Repr::Cancelled => "cancelled",
            Repr::Failed { kind, .. } => *kind,
        }
    }

    pub fn source(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match &self.repr {
            Repr::Cancelled => None,
            Repr::Failed { source, .. } => Some(source.as_ref()),
        }
    }
}

impl<E> From<E> for ProbeError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        if TypeId::of::<E>() == TypeId::of::<tokio::time::error::Elapsed>() {
            return Self::cancelled();
        }
        Self {
            repr: Repr::Failed {
                kind: type_name::<E>(),
                source: Box::new(err),
            },
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Cancelled => f.write_str("health check operation cancelled"),
            Repr::Failed { kind, source } => write!(f, "{}: {}", kind, source),
        }
    }
}

impl fmt::Debug for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Cancelled => f.write_str("ProbeError::Cancelled"),
            Repr::Failed { kind, source } => f
                .debug_struct("ProbeError")
                .field("kind", kind)
                .field("source", source)
                .finish(),
        }
    }
}

type CheckFn = dyn Fn(CancellationToken) -> BoxFuture<'static, ProbeResult> + Send + Sync;

/// A health check backed by a closure.
pub struct FnCheck {
    f: Box<CheckFn>,
}

impl FnCheck {
    /// Infallible synchronous check.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: Into<CheckResult>,
    {
        Self::from_result_fn(move || Ok(f().into()))
    }

    /// Synchronous check that may fail.
    pub fn from_result_fn<F>(f: F) -> Self
    where
        F: Fn() -> ProbeResult + Send + Sync + 'static,
    {
        Self {
            f: Box::new(move |_| futures::future::ready(f()).boxed()),
        }
    }

    /// Asynchronous check receiving the run's cancellation token.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProbeResult> + Send + 'static,
    {
        Self {
            f: Box::new(move |cancel| f(cancel).boxed()),
        }
    }
}

#[async_trait]
impl HealthCheck for FnCheck {
    async fn check(&self, cancel: &CancellationToken) -> ProbeResult {
        (self.f)(cancel.clone()).await
    }
}

// src/health/result.rs
use super::error::HealthCheckError;
use super::{CheckStatus, CompositeHealthCheckResult};
use serde_json::Value;
use std::borrow::Cow;

/// Structured details attached to a result, in insertion order.
pub type CheckData = serde_json::Map<String, Value>;

pub const TIMED_OUT_DESCRIPTION: &str = "The health check operation timed out";

/// The result of a single health check run. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckResult {
    status: CheckStatus,
    description: String,
    data: CheckData,
}

impl HealthCheckResult {
    /// Validated constructor: the status must not be `Unknown` and the
    /// description must not be blank.
    pub fn from_status(
        status: CheckStatus,
        description: impl Into<String>,
    ) -> Result<Self, HealthCheckError> {
        Self::from_status_with_data(status, description, CheckData::new())
    }

    pub fn from_status_with_data(
        status: CheckStatus,
        description: impl Into<String>,
        data: CheckData,
    ) -> Result<Self, HealthCheckError> {
        if status == CheckStatus::Unknown {
            return Err(HealthCheckError::invalid(
                "status",
                "Cannot create a health check result with status 'Unknown'.",
            ));
        }

        let description = description.into();
        super::error::require_name("description", &description)?;

        Ok(Self {
            status,
            description,
            data,
        })
    }

    pub fn healthy(description: impl Into<String>) -> Self {
        Self::fixed(CheckStatus::Healthy, description.into())
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::fixed(CheckStatus::Warning, description.into())
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self::fixed(CheckStatus::Unhealthy, description.into())
    }

    /// Unchecked: a blank description is caught by the execution guard, which
    /// reports the check unhealthy instead.
    fn fixed(status: CheckStatus, description: String) -> Self {
        Self {
            status,
            description,
            data: CheckData::new(),
        }
    }

    pub fn with_data(mut self, data: CheckData) -> Self {
        self.data = data;
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub(crate) fn timed_out() -> Self {
        Self::unhealthy(TIMED_OUT_DESCRIPTION)
    }

    pub(crate) fn exception(kind: &str) -> Self {
        Self::unhealthy(format!("Exception during check: {}", kind))
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub(crate) fn has_blank_description(&self) -> bool {
        self.description.trim().is_empty()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn data(&self) -> &CheckData {
        &self.data
    }
}

/// What a health check produces: either a plain result or, for grouped and
/// multi-target checks, a composite of named child results.
#[derive(Debug, Clone)]
pub enum CheckResult {
    Single(HealthCheckResult),
    Composite(CompositeHealthCheckResult),
}

impl CheckResult {
    pub fn status(&self) -> CheckStatus {
        match self {
            CheckResult::Single(result) => result.status(),
            CheckResult::Composite(composite) => composite.status(),
        }
    }

    pub fn description(&self) -> Cow<'_, str> {
        match self {
            CheckResult::Single(result) => Cow::Borrowed(result.description()),
            CheckResult::Composite(composite) => Cow::Owned(composite.description()),
        }
    }

    pub fn data(&self) -> Cow<'_, CheckData> {
        match self {
            CheckResult::Single(result) => Cow::Borrowed(result.data()),
            CheckResult::Composite(composite) => Cow::Owned(composite.data()),
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeHealthCheckResult> {
        match self {
            CheckResult::Composite(composite) => Some(composite),
            CheckResult::Single(_) => None,
        }
    }
}

impl From<HealthCheckResult> for CheckResult {
    fn from(result: HealthCheckResult) -> Self {
        CheckResult::Single(result)
    }
}

impl From<CompositeHealthCheckResult> for CheckResult {
    fn from(composite: CompositeHealthCheckResult) -> Self {
        CheckResult::Composite(composite)
    }
}

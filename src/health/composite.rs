// src/health/composite.rs
use super::error::{require_name, HealthCheckError};
use super::result::{CheckData, CheckResult, HealthCheckResult};
use super::CheckStatus;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Named child results merged into one status, description and data view.
///
/// The overall status is derived from the *set* of child statuses, so the
/// order and multiplicity of `add` calls never affect it.
#[derive(Debug, Clone)]
pub struct CompositeHealthCheckResult {
    initial_status: CheckStatus,
    partially_healthy_status: CheckStatus,
    results: Vec<(String, Arc<CheckResult>)>,
    names: HashSet<String>,
}

impl Default for CompositeHealthCheckResult {
    fn default() -> Self {
        Self::new(CheckStatus::Warning)
    }
}

impl CompositeHealthCheckResult {
    pub fn new(partially_healthy_status: CheckStatus) -> Self {
        Self::with_initial_status(partially_healthy_status, CheckStatus::Unknown)
    }

    pub fn with_initial_status(
        partially_healthy_status: CheckStatus,
        initial_status: CheckStatus,
    ) -> Self {
        Self {
            initial_status,
            partially_healthy_status,
            results: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Records a child result. Names are compared case-insensitively.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        result: Arc<CheckResult>,
    ) -> Result<(), HealthCheckError> {
        let name = name.into();
        require_name("name", &name)?;

        if result.status() == CheckStatus::Unknown {
            return Err(HealthCheckError::invalid(
                "status",
                "Cannot add unknown status to composite health check result",
            ));
        }

        if !self.names.insert(name.to_lowercase()) {
            return Err(HealthCheckError::duplicate_result(&name));
        }

        self.results.push((name, result));
        Ok(())
    }

    pub fn add_result(
        &mut self,
        name: impl Into<String>,
        result: impl Into<CheckResult>,
    ) -> Result<(), HealthCheckError> {
        self.add(name, Arc::new(result.into()))
    }

    pub fn add_status(
        &mut self,
        name: impl Into<String>,
        status: CheckStatus,
        description: impl Into<String>,
        data: CheckData,
    ) -> Result<(), HealthCheckError> {
        let result = HealthCheckResult::from_status_with_data(status, description, data)?;
        self.add_result(name, result)
    }

    pub fn status(&self) -> CheckStatus {
        let statuses: HashSet<CheckStatus> = self
            .results
            .iter()
            .map(|(_, result)| result.status())
            .collect();

        match statuses.len() {
            0 => self.initial_status,
            1 => statuses
                .into_iter()
                .next()
                .unwrap_or(self.initial_status),
            _ if statuses.contains(&CheckStatus::Healthy) => self.partially_healthy_status,
            _ => CheckStatus::Unhealthy,
        }
    }

    pub fn description(&self) -> String {
        self.results
            .iter()
            .map(|(name, result)| format!("{}: {}", name, result.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Child data nested under each child's name.
    pub fn data(&self) -> CheckData {
        self.results
            .iter()
            .map(|(name, result)| (name.clone(), Value::Object(result.data().into_owned())))
            .collect()
    }

    pub fn results(&self) -> impl Iterator<Item = (&str, &Arc<CheckResult>)> {
        self.results
            .iter()
            .map(|(name, result)| (name.as_str(), result))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CheckResult>> {
        let wanted = name.to_lowercase();
        self.results
            .iter()
            .find(|(existing, _)| existing.to_lowercase() == wanted)
            .map(|(_, result)| result)
    }

    pub fn partially_healthy_status(&self) -> CheckStatus {
        self.partially_healthy_status
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

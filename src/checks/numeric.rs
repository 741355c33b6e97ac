// src/checks/numeric.rs
use crate::health::{HealthCheckBuilder, HealthCheckError, HealthCheckResult};
use serde_json::Value;
use std::fmt::Display;

/// A value a numeric check can compare and report.
pub trait Reading: PartialOrd + Display + Into<Value> + Copy + Send + Sync + 'static {}

impl<T> Reading for T where T: PartialOrd + Display + Into<Value> + Copy + Send + Sync + 'static {}

fn bound_result(within: bool, description: String) -> HealthCheckResult {
    if within {
        HealthCheckResult::healthy(description)
    } else {
        HealthCheckResult::unhealthy(description)
    }
}

pub(crate) fn max_value_result<T: Reading>(max: T, value: T) -> HealthCheckResult {
    bound_result(value <= max, format!("max={}, current={}", max, value))
        .with_entry("max", max)
        .with_entry("current", value)
}

impl HealthCheckBuilder {
    /// Healthy while `current()` is at least `min`.
    pub fn add_min_value_check<T, F>(
        &mut self,
        name: &str,
        min: T,
        current: F,
    ) -> Result<&mut Self, HealthCheckError>
    where
        T: Reading,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.add_check_fn(name, move || {
            let value = current();
            bound_result(value >= min, format!("min={}, current={}", min, value))
                .with_entry("min", min)
                .with_entry("current", value)
        })
    }

    /// Healthy while `current()` is at most `max`.
    pub fn add_max_value_check<T, F>(
        &mut self,
        name: &str,
        max: T,
        current: F,
    ) -> Result<&mut Self, HealthCheckError>
    where
        T: Reading,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.add_check_fn(name, move || max_value_result(max, current()))
    }

    /// Healthy while `min <= current() <= max`.
    pub fn add_range_value_check<T, F>(
        &mut self,
        name: &str,
        (min, max): (T, T),
        current: F,
    ) -> Result<&mut Self, HealthCheckError>
    where
        T: Reading,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.add_check_fn(name, move || {
            let value = current();
            bound_result(
                value >= min && value <= max,
                format!("min={},max={}, current={}", min, max, value),
            )
            .with_entry("min", min)
            .with_entry("max", max)
            .with_entry("current", value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{CheckStatus, NoopResolver, ProbeResolver};
    use serde_json::json;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    async fn run(builder: &HealthCheckBuilder, name: &str) -> Arc<crate::health::CheckResult> {
        let resolver: Arc<dyn ProbeResolver> = Arc::new(NoopResolver);
        builder
            .check(name)
            .unwrap()
            .run(&resolver, &CancellationToken::new())
            .await
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let mut builder = HealthCheckBuilder::new();
        assert!(builder
            .add_min_value_check("", 42, || 2112)
            .unwrap_err()
            .is_invalid_argument());
        assert!(builder
            .add_max_value_check(" ", 42, || 2112)
            .unwrap_err()
            .is_invalid_argument());
        assert!(builder
            .add_range_value_check("", (0, 40), || 2112)
            .unwrap_err()
            .is_invalid_argument());
    }

    #[tokio::test]
    async fn test_min_value_check() {
        for (value, expected) in [(-1, CheckStatus::Unhealthy), (1, CheckStatus::Healthy)] {
            let mut builder = HealthCheckBuilder::new();
            builder
                .add_min_value_check("CheckName", 0, move || value)
                .unwrap();

            let result = run(&builder, "CheckName").await;

            assert_eq!(result.status(), expected);
            assert_eq!(result.description(), format!("min=0, current={}", value));
            assert_eq!(result.data()["min"], json!(0));
            assert_eq!(result.data()["current"], json!(value));
        }
    }

    #[tokio::test]
    async fn test_max_value_check() {
        for (value, expected) in [(1, CheckStatus::Unhealthy), (-1, CheckStatus::Healthy)] {
            let mut builder = HealthCheckBuilder::new();
            builder
                .add_max_value_check("CheckName", 0, move || value)
                .unwrap();

            let result = run(&builder, "CheckName").await;

            assert_eq!(result.status(), expected);
            assert_eq!(result.description(), format!("max=0, current={}", value));
            assert_eq!(result.data()["max"], json!(0));
            assert_eq!(result.data()["current"], json!(value));
        }
    }

    #[tokio::test]
    async fn test_range_value_check() {
        for (value, expected) in [
            (11, CheckStatus::Unhealthy),
            (4, CheckStatus::Unhealthy),
            (6, CheckStatus::Healthy),
            (10, CheckStatus::Healthy),
        ] {
            let mut builder = HealthCheckBuilder::new();
            builder
                .add_range_value_check("CheckName", (5, 10), move || value)
                .unwrap();

            let result = run(&builder, "CheckName").await;

            assert_eq!(result.status(), expected);
            assert_eq!(
                result.description(),
                format!("min=5,max=10, current={}", value)
            );
            let keys = result.data().keys().cloned().collect::<Vec<_>>();
            assert_eq!(keys, ["min", "max", "current"]);
        }
    }

    #[tokio::test]
    async fn test_float_readings() {
        let mut builder = HealthCheckBuilder::new();
        builder
            .add_max_value_check("load", 0.75_f64, || 0.5_f64)
            .unwrap();

        let result = run(&builder, "load").await;

        assert_eq!(result.status(), CheckStatus::Healthy);
        assert_eq!(result.description(), "max=0.75, current=0.5");
    }
}

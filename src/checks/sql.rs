// src/checks/sql.rs
use crate::health::{
    HealthCheck, HealthCheckBuilder, HealthCheckError, HealthCheckResult, ProbeResult,
};
use async_trait::async_trait;
use sqlx::{AnyConnection, Connection, Row};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Opens a connection and runs `SELECT 1`.
///
/// The driver is picked from the connection string's scheme (`postgres://`,
/// `mysql://`, `sqlite:`). Connection and query errors surface as exception
/// results through the execution guard.
pub struct SqlCheck {
    name: String,
    connection_string: String,
}

impl SqlCheck {
    pub fn new(name: &str, connection_string: &str) -> Result<Self, HealthCheckError> {
        if name.trim().is_empty() {
            return Err(HealthCheckError::invalid(
                "name",
                "Value cannot be empty or whitespace.",
            ));
        }
        if connection_string.trim().is_empty() {
            return Err(HealthCheckError::invalid(
                "connection_string",
                "Value cannot be empty or whitespace.",
            ));
        }

        Ok(Self {
            name: name.to_string(),
            connection_string: connection_string.to_string(),
        })
    }

    pub fn check_name(&self) -> String {
        format!("SqlCheck({})", self.name)
    }
}

// The connection string may carry credentials.
impl fmt::Debug for SqlCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlCheck").field("name", &self.name).finish()
    }
}

#[async_trait]
impl HealthCheck for SqlCheck {
    async fn check(&self, _cancel: &CancellationToken) -> ProbeResult {
        sqlx::any::install_default_drivers();

        let mut connection = AnyConnection::connect(&self.connection_string).await?;
        let backend = connection.backend_name().to_string();

        let row = sqlx::query("SELECT 1").fetch_one(&mut connection).await?;
        // drivers disagree on the integer width of a literal
        let value = row
            .try_get::<i64, _>(0)
            .or_else(|_| row.try_get::<i32, _>(0).map(i64::from))?;
        connection.close().await?;

        debug!("{} answered {} via {}", self.check_name(), value, backend);
        let result = if value == 1 {
            HealthCheckResult::healthy(format!("{}: Healthy", self.check_name()))
        } else {
            HealthCheckResult::unhealthy(format!("{}: Unhealthy", self.check_name()))
        };
        Ok(result.with_entry("backend", backend).into())
    }
}

impl HealthCheckBuilder {
    /// Registers `SqlCheck({name})` with the builder's default cache duration.
    pub fn add_sql_check(
        &mut self,
        name: &str,
        connection_string: &str,
    ) -> Result<&mut Self, HealthCheckError> {
        let duration = self.default_cache_duration();
        self.add_sql_check_with_duration(name, connection_string, duration)
    }

    pub fn add_sql_check_with_duration(
        &mut self,
        name: &str,
        connection_string: &str,
        cache_duration: Duration,
    ) -> Result<&mut Self, HealthCheckError> {
        let check = SqlCheck::new(name, connection_string)?;
        self.add_check_with_duration(&check.check_name(), check, cache_duration)
    }
}

// src/config/models.rs
use crate::health::{cache_duration_from_millis, CheckStatus, DEFAULT_GROUP_STATUS};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub health: HealthSettings,
    #[serde(default)]
    pub url_checks: Vec<UrlCheckConfig>,
    #[serde(default)]
    pub sql_checks: Vec<SqlCheckConfig>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub memory: Option<MemoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_health_path")]
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_health_path(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid server address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Zero disables caching.
    #[serde(default = "default_cache_duration_ms")]
    pub default_cache_duration_ms: i64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_partial_status")]
    pub partial_success_status: CheckStatus,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            default_cache_duration_ms: default_cache_duration_ms(),
            timeout_ms: default_timeout_ms(),
            partial_success_status: default_partial_status(),
        }
    }
}

impl HealthSettings {
    pub fn default_cache_duration(&self) -> Result<Duration> {
        Ok(cache_duration_from_millis(self.default_cache_duration_ms)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlCheckConfig {
    pub url: String,
    /// Overrides `health.default_cache_duration_ms` for this check.
    #[serde(default)]
    pub cache_duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlCheckConfig {
    pub name: String,
    /// `postgres://`, `mysql://` or `sqlite:` URL.
    pub connection_string: String,
    #[serde(default)]
    pub cache_duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default = "default_group_partial_status")]
    pub partial_success_status: CheckStatus,
    #[serde(default)]
    pub url_checks: Vec<UrlCheckConfig>,
}

/// Upper bounds in bytes for the process memory checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub max_private_bytes: Option<u64>,
    pub max_virtual_bytes: Option<u64>,
    pub max_working_set_bytes: Option<u64>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_cache_duration_ms() -> i64 {
    5 * 60 * 1000
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_partial_status() -> CheckStatus {
    CheckStatus::Unhealthy
}

fn default_group_partial_status() -> CheckStatus {
    DEFAULT_GROUP_STATUS
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !self.server.path.starts_with('/') {
            bail!("server.path must start with '/': {}", self.server.path);
        }
        if self.metrics.enabled {
            if !self.metrics.path.starts_with('/') {
                bail!("metrics.path must start with '/': {}", self.metrics.path);
            }
            if self.metrics.port == self.server.port {
                bail!("metrics.port must differ from server.port ({})", self.server.port);
            }
        }

        self.health
            .default_cache_duration()
            .context("Invalid health.default_cache_duration_ms")?;
        if self.health.timeout_ms == 0 {
            bail!("health.timeout_ms must be greater than zero");
        }
        validate_partial_status("health.partial_success_status", self.health.partial_success_status)?;

        validate_url_checks("url_checks", &self.url_checks)?;
        validate_sql_checks(&self.sql_checks)?;

        let mut group_names = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                bail!("Group names cannot be empty");
            }
            if !group_names.insert(group.name.to_lowercase()) {
                bail!("Duplicate group name: {}", group.name);
            }
            validate_partial_status(
                &format!("groups.{}.partial_success_status", group.name),
                group.partial_success_status,
            )?;
            if group.url_checks.is_empty() {
                bail!("Group '{}' must contain at least one check", group.name);
            }
            validate_url_checks(&format!("groups.{}.url_checks", group.name), &group.url_checks)?;
        }

        Ok(())
    }
}

fn validate_partial_status(field: &str, status: CheckStatus) -> Result<()> {
    if status == CheckStatus::Unknown {
        bail!("{}: status 'Unknown' is not valid for partial success", field);
    }
    Ok(())
}

fn validate_sql_checks(checks: &[SqlCheckConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for check in checks {
        if check.name.trim().is_empty() {
            bail!("sql_checks: name cannot be empty");
        }
        if check.connection_string.trim().is_empty() {
            bail!("sql_checks.{}: connection_string cannot be empty", check.name);
        }
        if !seen.insert(check.name.to_lowercase()) {
            bail!("sql_checks: duplicate name '{}'", check.name);
        }
        if let Some(ms) = check.cache_duration_ms {
            cache_duration_from_millis(ms)
                .with_context(|| format!("sql_checks.{}: invalid cache_duration_ms", check.name))?;
        }
    }
    Ok(())
}

fn validate_url_checks(field: &str, checks: &[UrlCheckConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for check in checks {
        if check.url.trim().is_empty() {
            bail!("{}: URL cannot be empty", field);
        }
        url::Url::parse(&check.url)
            .with_context(|| format!("{}: invalid URL '{}'", field, check.url))?;
        if !seen.insert(check.url.to_lowercase()) {
            bail!("{}: duplicate URL '{}'", field, check.url);
        }
        if let Some(ms) = check.cache_duration_ms {
            cache_duration_from_millis(ms)
                .with_context(|| format!("{}: invalid cache_duration_ms for '{}'", field, check.url))?;
        }
    }
    Ok(())
}

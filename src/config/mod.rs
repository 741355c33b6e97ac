// src/config/mod.rs
mod models;

pub use models::*;

use crate::checks::UrlCheck;
use crate::health::{cache_duration_from_millis, HealthCheckBuilder, HealthCheckError};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(&contents).context("Failed to parse JSON config")?,
    };

    config.validate()?;
    Ok(config)
}

/// Builds the check registry described by `config`.
pub fn build_registry(config: &Config) -> Result<HealthCheckBuilder> {
    let mut builder = HealthCheckBuilder::new();
    builder
        .with_default_cache_duration(config.health.default_cache_duration()?)
        .with_partial_success_status(config.health.partial_success_status)?;

    for check in &config.url_checks {
        register_url_check(&mut builder, check)?;
    }

    for check in &config.sql_checks {
        let duration = match check.cache_duration_ms {
            Some(ms) => cache_duration_from_millis(ms)?,
            None => builder.default_cache_duration(),
        };
        builder.add_sql_check_with_duration(&check.name, &check.connection_string, duration)?;
    }

    for group in &config.groups {
        builder
            .add_group(&group.name, group.partial_success_status, |members| {
                for check in &group.url_checks {
                    register_url_check(members, check)?;
                }
                Ok(())
            })
            .with_context(|| format!("Failed to register group '{}'", group.name))?;
    }

    if let Some(memory) = &config.memory {
        if let Some(max) = memory.max_private_bytes {
            builder.add_private_memory_size_check(max)?;
        }
        if let Some(max) = memory.max_virtual_bytes {
            builder.add_virtual_memory_size_check(max)?;
        }
        if let Some(max) = memory.max_working_set_bytes {
            builder.add_working_set_check(max)?;
        }
    }

    info!(
        "Registered {} health checks in {} groups",
        builder.len(),
        builder.groups().len() - 1
    );
    Ok(builder)
}

fn register_url_check(
    builder: &mut HealthCheckBuilder,
    check: &UrlCheckConfig,
) -> Result<(), HealthCheckError> {
    match check.cache_duration_ms {
        None => builder.add_url_check(&check.url)?,
        Some(ms) => builder.add_check_with_duration(
            &format!("UrlCheck({})", check.url),
            UrlCheck::parse([check.url.as_str()])?,
            cache_duration_from_millis(ms)?,
        )?,
    };
    Ok(())
}

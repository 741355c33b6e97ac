// src/health/error.rs
use super::CheckStatus;
use std::time::Duration;

/// Configuration-time misuse of the health check API.
///
/// These are raised synchronously to the registering code and never produced
/// while checks execute.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthCheckError {
    #[error("{message} (argument: {argument})")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    #[error("{message}")]
    DuplicateName { name: String, message: String },

    #[error("{0}")]
    UnsupportedOperation(String),
}

impl HealthCheckError {
    pub(crate) fn invalid(argument: &'static str, message: impl Into<String>) -> Self {
        HealthCheckError::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    pub(crate) fn duplicate_check(name: &str) -> Self {
        HealthCheckError::DuplicateName {
            name: name.to_string(),
            message: format!("A check with name '{}' has already been registered.", name),
        }
    }

    pub(crate) fn duplicate_group(name: &str) -> Self {
        HealthCheckError::DuplicateName {
            name: name.to_string(),
            message: format!("A group with name '{}' has already been registered.", name),
        }
    }

    pub(crate) fn duplicate_result(name: &str) -> Self {
        HealthCheckError::DuplicateName {
            name: name.to_string(),
            message: format!("Check name {} must be unique", name),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, HealthCheckError::InvalidArgument { .. })
    }

    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, HealthCheckError::DuplicateName { .. })
    }

    pub fn is_unsupported_operation(&self) -> bool {
        matches!(self, HealthCheckError::UnsupportedOperation(_))
    }
}

pub(crate) fn require_name(argument: &'static str, name: &str) -> Result<(), HealthCheckError> {
    if name.trim().is_empty() {
        return Err(HealthCheckError::invalid(
            argument,
            "Value cannot be empty or whitespace.",
        ));
    }
    Ok(())
}

pub(crate) fn require_partial_status(
    argument: &'static str,
    status: CheckStatus,
) -> Result<(), HealthCheckError> {
    if status == CheckStatus::Unknown {
        return Err(HealthCheckError::invalid(
            argument,
            "Check status 'Unknown' is not valid for partial success.",
        ));
    }
    Ok(())
}

/// Converts a signed millisecond count (as found in config files) into a
/// cache duration. Zero disables caching.
pub fn cache_duration_from_millis(millis: i64) -> Result<Duration, HealthCheckError> {
    u64::try_from(millis).map(Duration::from_millis).map_err(|_| {
        HealthCheckError::invalid(
            "cache_duration",
            "Duration must be zero (disabled) or a positive duration.",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_cache_duration_is_rejected() {
        let err = cache_duration_from_millis(-1).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err
            .to_string()
            .starts_with("Duration must be zero (disabled) or a positive duration."));

        assert_eq!(cache_duration_from_millis(0).unwrap(), Duration::ZERO);
        assert_eq!(
            cache_duration_from_millis(1500).unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_blank_names_are_rejected() {
        assert!(require_name("name", "  ").is_err());
        assert!(require_name("name", "").is_err());
        assert!(require_name("name", "db").is_ok());
    }
}

use std::time::Duration;

use crate::authz::AuthzMode;
use crate::errors::{AuthzError, AuthzResult};

const DEFAULT_AUDIT_CAPACITY: usize = 1024;

/// Engine settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub mode: AuthzMode,
    pub lookup_timeout: Option<Duration>,
    pub audit_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: AuthzMode::Strict,
            lookup_timeout: None,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> AuthzResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AuthzResult<Self> {
        let mode = match lookup("AUTHZ_MODE") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => AuthzMode::Strict,
        };

        let lookup_timeout = lookup("AUTHZ_LOOKUP_TIMEOUT_MS")
            .map(|value| value.trim().parse::<u64>())
            .transpose()
            .map_err(|_| AuthzError::configuration("AUTHZ_LOOKUP_TIMEOUT_MS must be a valid integer"))?
            .map(|millis| {
                if millis == 0 {
                    Err(AuthzError::configuration("AUTHZ_LOOKUP_TIMEOUT_MS must be positive"))
                } else {
                    Ok(Duration::from_millis(millis))
                }
            })
            .transpose()?;

        let audit_capacity = lookup("AUTHZ_AUDIT_CAPACITY")
            .map(|value| value.trim().parse::<usize>())
            .unwrap_or(Ok(DEFAULT_AUDIT_CAPACITY))
            .map_err(|_| AuthzError::configuration("AUTHZ_AUDIT_CAPACITY must be a valid integer"))?;

        Ok(Self {
            mode,
            lookup_timeout,
            audit_capacity,
        })
    }
}

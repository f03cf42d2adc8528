/*!
 * Synchronization Configuration
 *
 * Runtime configuration for the wait registry
 */

use crate::core::errors::{WaitError, WaitResult};
use crate::core::limits::{
    DEFAULT_MAX_OBJECTS, ENV_DEFAULT_TIMEOUT_MS, ENV_MAX_OBJECTS, ENV_STRICT, MAX_WAIT_OBJECTS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synchronization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Largest wait list accepted (at most `MAX_WAIT_OBJECTS`)
    pub max_objects: usize,
    /// Reject the whole wait on an invalid entry instead of skipping it
    pub strict: bool,
    /// Timeout used by the `wait_default` facade helpers (`None` = infinite)
    pub default_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_objects: DEFAULT_MAX_OBJECTS,
            strict: true,
            default_timeout: None,
        }
    }
}

impl SyncConfig {
    /// Any invalid list entry aborts the wait
    pub const fn strict() -> Self {
        Self {
            max_objects: DEFAULT_MAX_OBJECTS,
            strict: true,
            default_timeout: None,
        }
    }

    /// Invalid list entries are skipped and logged
    pub const fn lenient() -> Self {
        Self {
            max_objects: DEFAULT_MAX_OBJECTS,
            strict: false,
            default_timeout: None,
        }
    }

    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Build from `MULTIWAIT_*` environment variables on top of the defaults
    ///
    /// Environment variables:
    /// - MULTIWAIT_MAX_OBJECTS: per-wait object ceiling (1..=64)
    /// - MULTIWAIT_STRICT: `1`/`true` or `0`/`false`
    /// - MULTIWAIT_DEFAULT_TIMEOUT_MS: facade default timeout in milliseconds
    pub fn from_env() -> WaitResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> WaitResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_OBJECTS) {
            config.max_objects = raw.trim().parse().map_err(|_| {
                WaitError::InvalidConfig(format!("{ENV_MAX_OBJECTS}={raw} is not a number"))
            })?;
        }

        if let Some(raw) = lookup(ENV_STRICT) {
            config.strict = match raw.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(WaitError::InvalidConfig(format!(
                        "{ENV_STRICT}={other} is not a boolean"
                    )))
                }
            };
        }

        if let Some(raw) = lookup(ENV_DEFAULT_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                WaitError::InvalidConfig(format!(
                    "{ENV_DEFAULT_TIMEOUT_MS}={raw} is not a number"
                ))
            })?;
            config.default_timeout = Some(Duration::from_millis(millis));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check limits against the hard wait capacity
    pub fn validate(&self) -> WaitResult<()> {
        if self.max_objects == 0 || self.max_objects > MAX_WAIT_OBJECTS {
            return Err(WaitError::InvalidConfig(format!(
                "max_objects must be within 1..={MAX_WAIT_OBJECTS}, got {}",
                self.max_objects
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(SyncConfig::default().validate().is_ok());
        assert!(SyncConfig::lenient().validate().is_ok());
        assert!(SyncConfig::strict().strict);
    }

    #[test]
    fn test_validate_rejects_bad_capacity() {
        assert!(SyncConfig::default().with_max_objects(0).validate().is_err());
        assert!(SyncConfig::default()
            .with_max_objects(MAX_WAIT_OBJECTS + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = SyncConfig::from_lookup(lookup(&[
            (ENV_MAX_OBJECTS, "8"),
            (ENV_STRICT, "false"),
            (ENV_DEFAULT_TIMEOUT_MS, "250"),
        ]))
        .unwrap();

        assert_eq!(config.max_objects, 8);
        assert!(!config.strict);
        assert_eq!(config.default_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = SyncConfig::from_lookup(lookup(&[(ENV_STRICT, "maybe")])).unwrap_err();
        assert!(matches!(err, WaitError::InvalidConfig(_)));

        let err = SyncConfig::from_lookup(lookup(&[(ENV_MAX_OBJECTS, "100")])).unwrap_err();
        assert!(matches!(err, WaitError::InvalidConfig(_)));
    }

    #[test]
    fn test_json_round_trip_with_partial_input() {
        let config: SyncConfig = serde_json::from_str(r#"{"strict": false}"#).unwrap();
        assert_eq!(config.max_objects, DEFAULT_MAX_OBJECTS);
        assert!(!config.strict);
    }
}

//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::admission::PolicyClass;

/// Main configuration for admission control.
///
/// Everything here is fixed at process start; there is no hot reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Sweeper configuration
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Per-class overrides of the built-in policies
    #[serde(default)]
    pub policies: HashMap<PolicyClass, PolicyConfig>,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            sweeper: SweeperConfig::default(),
            policies: HashMap::new(),
        }
    }
}

/// Sweeper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between eviction sweeps
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    60
}

/// Override for one policy class.
///
/// Fields left unset fall back to the class's built-in policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Window duration in seconds
    #[serde(default)]
    pub window_secs: Option<u64>,

    /// Maximum admitted requests per key per window
    #[serde(default)]
    pub max_requests: Option<u64>,
}

impl TurnstileConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            crate::error::TurnstileError::Config(format!("Failed to parse config: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TurnstileConfig::default();
        assert_eq!(config.sweeper.interval_secs, 60);
        assert!(config.policies.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
sweeper:
  interval_secs: 30
policies:
  auth:
    window_secs: 600
    max_requests: 3
  search:
    max_requests: 50
"#;
        let config = TurnstileConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.sweeper.interval_secs, 30);

        let auth = &config.policies[&PolicyClass::Auth];
        assert_eq!(auth.window_secs, Some(600));
        assert_eq!(auth.max_requests, Some(3));

        // Partial override: window falls back to the built-in.
        let search = &config.policies[&PolicyClass::Search];
        assert_eq!(search.window_secs, None);
        assert_eq!(search.max_requests, Some(50));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = TurnstileConfig::from_yaml("{}").unwrap();
        assert_eq!(config.sweeper.interval_secs, 60);
    }

    #[test]
    fn test_parse_invalid_config_is_a_config_error() {
        let result = TurnstileConfig::from_yaml("sweeper: [not, a, map]");
        assert!(matches!(
            result,
            Err(crate::error::TurnstileError::Config(_))
        ));
    }
}

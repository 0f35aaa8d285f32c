//! Named admission policies for the served endpoint classes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::TurnstileConfig;

use super::limiter::Limiter;
use super::sweeper::{Sweeper, SweeperHandle};
use super::window::Policy;

/// The endpoint classes with distinct admission policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyClass {
    /// General API traffic: long window, high ceiling.
    General,
    /// Authentication endpoints: long window, low ceiling.
    Auth,
    /// Upload endpoints: long window, very low ceiling.
    Upload,
    /// Search endpoints: short window, moderate ceiling.
    Search,
}

impl PolicyClass {
    /// Every class, in registration order.
    pub const ALL: [PolicyClass; 4] = [
        PolicyClass::General,
        PolicyClass::Auth,
        PolicyClass::Upload,
        PolicyClass::Search,
    ];

    /// The built-in policy for this class, used when no override is
    /// configured.
    fn default_policy(self) -> Policy {
        match self {
            PolicyClass::General => Policy::new(Duration::from_secs(900), 100),
            PolicyClass::Auth => Policy::new(Duration::from_secs(900), 5),
            PolicyClass::Upload => Policy::new(Duration::from_secs(3600), 10),
            PolicyClass::Search => Policy::new(Duration::from_secs(60), 30),
        }
    }

    /// Stable name used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyClass::General => "general",
            PolicyClass::Auth => "auth",
            PolicyClass::Upload => "upload",
            PolicyClass::Search => "search",
        }
    }
}

impl std::fmt::Display for PolicyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The process-wide set of named limiters, one per [`PolicyClass`].
///
/// Pure configuration: instantiated once at startup, each limiter with its
/// own key space, then handed to the serving layer. Window durations and
/// ceilings are fixed for the life of the process.
pub struct PolicyRegistry {
    limiters: HashMap<PolicyClass, Arc<Limiter>>,
    sweep_interval: Duration,
}

impl PolicyRegistry {
    /// Build the registry with built-in policies.
    pub fn new() -> Self {
        Self::from_config(&TurnstileConfig::default())
    }

    /// Build the registry, applying any per-class overrides in `config`.
    pub fn from_config(config: &TurnstileConfig) -> Self {
        let mut limiters = HashMap::with_capacity(PolicyClass::ALL.len());

        for class in PolicyClass::ALL {
            let mut policy = class.default_policy();
            if let Some(overrides) = config.policies.get(&class) {
                if let Some(window_secs) = overrides.window_secs {
                    policy.window = Duration::from_secs(window_secs);
                }
                if let Some(max_requests) = overrides.max_requests {
                    policy.max_requests = max_requests;
                }
            }

            info!(
                class = %class,
                limit = policy.max_requests,
                window_secs = policy.window.as_secs(),
                "Registered admission policy"
            );
            limiters.insert(class, Arc::new(Limiter::new(policy)));
        }

        Self {
            limiters,
            sweep_interval: Duration::from_secs(config.sweeper.interval_secs),
        }
    }

    /// The limiter for an endpoint class.
    pub fn get(&self, class: PolicyClass) -> &Arc<Limiter> {
        // Every class is registered at construction.
        &self.limiters[&class]
    }

    /// All registered limiters, for the sweeper.
    pub fn limiters(&self) -> Vec<Arc<Limiter>> {
        self.limiters.values().cloned().collect()
    }

    /// Spawn the shared sweep task over every registered store.
    pub fn start_sweeper(&self) -> SweeperHandle {
        Sweeper::new(self.sweep_interval).spawn(self.limiters())
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::request::RequestMeta;

    #[test]
    fn test_registry_has_every_class() {
        let registry = PolicyRegistry::new();

        for class in PolicyClass::ALL {
            let policy = registry.get(class).policy();
            let defaults = class.default_policy();
            assert_eq!(policy.max_requests, defaults.max_requests);
            assert_eq!(policy.window, defaults.window);
        }
        assert_eq!(registry.limiters().len(), 4);
    }

    #[test]
    fn test_registry_applies_overrides() {
        let mut config = TurnstileConfig::default();
        config.policies.insert(
            PolicyClass::Auth,
            PolicyConfig {
                window_secs: Some(60),
                max_requests: Some(2),
            },
        );
        let registry = PolicyRegistry::from_config(&config);

        let auth = registry.get(PolicyClass::Auth).policy();
        assert_eq!(auth.window, Duration::from_secs(60));
        assert_eq!(auth.max_requests, 2);

        // Other classes keep their built-ins.
        let search = registry.get(PolicyClass::Search).policy();
        assert_eq!(search.max_requests, 30);
    }

    #[test]
    fn test_classes_have_independent_key_spaces() {
        let registry = PolicyRegistry::new();
        let req = RequestMeta::new("10.0.0.1:80".parse().unwrap(), "POST", "/auth/login");

        for _ in 0..5 {
            assert!(registry.get(PolicyClass::Auth).check(&req).is_allowed());
        }
        assert!(!registry.get(PolicyClass::Auth).check(&req).is_allowed());

        // The same client is still admitted elsewhere.
        assert!(registry.get(PolicyClass::General).check(&req).is_allowed());
    }

    #[tokio::test]
    async fn test_registry_sweeper_lifecycle() {
        let registry = PolicyRegistry::new();
        let handle = registry.start_sweeper();
        handle.shutdown().await;
    }
}

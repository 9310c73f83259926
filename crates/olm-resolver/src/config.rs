//! Resolver configuration from the environment

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Gate for the platform-version provider; enabled only by the value `true`
pub const SYSTEM_CONSTRAINTS_ENV: &str = "SYSTEM_CONSTRAINTS";
/// Path of the runtime constraints file
pub const RUNTIME_CONSTRAINTS_ENV: &str = "RUNTIME_CONSTRAINTS";
/// Seconds a fetched cluster version stays valid; unset keeps it forever
pub const CLUSTER_VERSION_MAX_AGE_ENV: &str = "CLUSTER_VERSION_MAX_AGE_SECS";
pub const KUBE_API_URL_ENV: &str = "KUBE_API_URL";
pub const KUBE_TOKEN_ENV: &str = "KUBE_TOKEN";

/// Reads configuration variables.
///
/// With `use_environment` off only explicitly set overrides are visible,
/// which keeps tests independent of the process environment.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    use_environment: bool,
    overrides: HashMap<String, String>,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self {
            use_environment,
            overrides: HashMap::new(),
        }
    }

    /// Set a variable, taking precedence over the environment
    pub fn with_var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.overrides.insert(name.to_string(), value.into());
        self
    }

    /// Get a variable; empty values count as unset
    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(name) {
            return Some(value.clone()).filter(|s| !s.is_empty());
        }
        if !self.use_environment {
            return None;
        }

        env::var(name).ok().filter(|s| !s.is_empty())
    }
}

/// Everything the default init hooks need
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    pub system_constraints: bool,
    pub runtime_constraints_path: Option<PathBuf>,
    pub cluster_version_max_age: Option<Duration>,
    pub kube_api_url: Option<String>,
    pub kube_token: Option<String>,
}

impl ResolverConfig {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::load(&ConfigLoader::new(true))
    }

    pub fn load(loader: &ConfigLoader) -> Self {
        let cluster_version_max_age = loader.get(CLUSTER_VERSION_MAX_AGE_ENV).and_then(|raw| {
            match raw.trim().parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(e) => {
                    log::warn!(
                        "ignoring {}={:?}: {}",
                        CLUSTER_VERSION_MAX_AGE_ENV,
                        raw,
                        e
                    );
                    None
                }
            }
        });

        Self {
            system_constraints: loader.get(SYSTEM_CONSTRAINTS_ENV).as_deref() == Some("true"),
            runtime_constraints_path: loader.get(RUNTIME_CONSTRAINTS_ENV).map(PathBuf::from),
            cluster_version_max_age,
            kube_api_url: loader.get(KUBE_API_URL_ENV),
            kube_token: loader.get(KUBE_TOKEN_ENV),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_environment() {
        let config = ResolverConfig::load(&ConfigLoader::new(false));
        assert_eq!(config, ResolverConfig::default());
    }

    #[test]
    fn test_system_constraints_gate() {
        for (value, expected) in [("true", true), ("TRUE", false), ("1", false), ("", false)] {
            let loader = ConfigLoader::new(false).with_var(SYSTEM_CONSTRAINTS_ENV, value);
            let config = ResolverConfig::load(&loader);
            assert_eq!(config.system_constraints, expected, "value {:?}", value);
        }
    }

    #[test]
    fn test_overrides() {
        let loader = ConfigLoader::new(false)
            .with_var(RUNTIME_CONSTRAINTS_ENV, "/etc/olm/runtime_constraints.json")
            .with_var(CLUSTER_VERSION_MAX_AGE_ENV, "300")
            .with_var(KUBE_API_URL_ENV, "https://api.cluster:6443")
            .with_var(KUBE_TOKEN_ENV, "");

        let config = ResolverConfig::load(&loader);
        assert_eq!(
            config.runtime_constraints_path,
            Some(PathBuf::from("/etc/olm/runtime_constraints.json"))
        );
        assert_eq!(config.cluster_version_max_age, Some(Duration::from_secs(300)));
        assert_eq!(config.kube_api_url.as_deref(), Some("https://api.cluster:6443"));
        assert_eq!(config.kube_token, None);
    }

    #[test]
    fn test_invalid_max_age_is_ignored() {
        let loader = ConfigLoader::new(false).with_var(CLUSTER_VERSION_MAX_AGE_ENV, "five minutes");
        assert_eq!(ResolverConfig::load(&loader).cluster_version_max_age, None);
    }
}

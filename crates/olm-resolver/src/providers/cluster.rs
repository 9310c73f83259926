//! Cluster version discovery

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use olm_semver::{SemverError, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the singleton cluster version resource
pub const CLUSTER_VERSION_NAME: &str = "version";

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("nil client")]
    NilClient,

    #[error("failed to get cluster version: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("incorrect client behavior observed")]
    IncorrectClientBehavior,

    #[error("desired release missing from resource")]
    DesiredReleaseMissing,

    #[error("resource has invalid desired release: {0}")]
    InvalidDesiredRelease(#[source] SemverError),
}

/// The cluster version resource, reduced to what resolution reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterVersion {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ClusterVersionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterVersionStatus {
    #[serde(default)]
    pub desired: Release,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
}

impl ClusterVersion {
    /// A resource whose desired release is `version`
    pub fn with_desired(version: &str) -> Self {
        Self {
            metadata: ObjectMeta {
                name: CLUSTER_VERSION_NAME.to_string(),
            },
            status: ClusterVersionStatus {
                desired: Release {
                    version: version.to_string(),
                    image: String::new(),
                },
            },
        }
    }
}

/// Reads cluster version resources by name.
///
/// `Ok(None)` means the client returned neither an object nor an error.
pub trait ClusterVersionsGetter: Send + Sync {
    fn get(&self, name: &str) -> anyhow::Result<Option<ClusterVersion>>;
}

/// Source of facts about the cluster resolution runs against
pub trait ClusterProperties: Send + Sync {
    fn version(&self) -> Result<Version, ClusterError>;
}

#[derive(Debug, Clone)]
struct Cached {
    version: Version,
    fetched_at: Instant,
}

/// Cluster properties backed by a client, fetched lazily.
///
/// The first successful fetch is cached and, without a max age, reused for
/// the life of the process. Failures are never cached. Callers serialize on
/// one mutex, so only one network round trip is in flight at a time.
pub struct CachedClusterProperties {
    client: Option<Arc<dyn ClusterVersionsGetter>>,
    max_age: Option<Duration>,
    cached: Mutex<Option<Cached>>,
}

impl CachedClusterProperties {
    pub fn new(client: Option<Arc<dyn ClusterVersionsGetter>>) -> Self {
        Self {
            client,
            max_age: None,
            cached: Mutex::new(None),
        }
    }

    /// Refetch once the cached version is older than `max_age`
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Fetch the version now, replacing the cached one on success
    pub fn refresh(&self) -> Result<Version, ClusterError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        let version = self.fetch()?;
        *cached = Some(Cached {
            version: version.clone(),
            fetched_at: Instant::now(),
        });
        Ok(version)
    }

    fn fetch(&self) -> Result<Version, ClusterError> {
        let client = self.client.as_ref().ok_or(ClusterError::NilClient)?;

        let resource = client
            .get(CLUSTER_VERSION_NAME)
            .map_err(ClusterError::Fetch)?
            .ok_or(ClusterError::IncorrectClientBehavior)?;

        let desired = &resource.status.desired.version;
        if desired.is_empty() {
            return Err(ClusterError::DesiredReleaseMissing);
        }

        let version =
            Version::parse_tolerant(desired).map_err(ClusterError::InvalidDesiredRelease)?;
        log::debug!("fetched cluster version {}", version);
        Ok(version)
    }

    fn is_fresh(&self, cached: &Cached) -> bool {
        self.max_age
            .map_or(true, |max_age| cached.fetched_at.elapsed() < max_age)
    }
}

impl ClusterProperties for CachedClusterProperties {
    fn version(&self) -> Result<Version, ClusterError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(hit) = cached.as_ref() {
            if self.is_fresh(hit) {
                return Ok(hit.version.clone());
            }
            log::debug!("cached cluster version {} expired", hit.version);
        }

        let version = self.fetch()?;
        *cached = Some(Cached {
            version: version.clone(),
            fetched_at: Instant::now(),
        });
        Ok(version)
    }
}

/// Cluster properties with a fixed version, for tests and offline use
#[derive(Debug, Clone)]
pub struct StaticClusterProperties {
    version: Version,
}

impl StaticClusterProperties {
    pub fn new(version: Version) -> Self {
        Self { version }
    }
}

impl ClusterProperties for StaticClusterProperties {
    fn version(&self) -> Result<Version, ClusterError> {
        Ok(self.version.clone())
    }
}

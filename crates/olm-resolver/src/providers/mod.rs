//! Constraint providers: pluggable policy that adds constraints per entry

pub mod cluster;
pub mod kube;
mod platform;
mod runtime;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::cache::Entry;
use crate::solver::Constraint;

pub use cluster::{
    CachedClusterProperties, ClusterError, ClusterProperties, ClusterVersion, ClusterVersionsGetter,
    StaticClusterProperties,
};
pub use kube::{KubeClientConfig, KubeClientError, KubeClusterVersionClient};
pub use platform::PlatformVersionProvider;
pub use runtime::{PropertiesFile, RuntimeConstraintsError, RuntimeConstraintsProvider};

/// The slot a provider occupies on a resolver; at most one provider per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    PlatformVersion,
    RuntimeConstraints,
    Custom(&'static str),
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::PlatformVersion => f.write_str("platform version"),
            ProviderKind::RuntimeConstraints => f.write_str("runtime constraints"),
            ProviderKind::Custom(name) => f.write_str(name),
        }
    }
}

/// Errors that abort a resolution.
///
/// Per-entry policy violations are reported as Prohibited constraints
/// instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("nil clusterProperties")]
    MissingClusterProperties,

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("{0}")]
    Other(#[source] anyhow::Error),
}

/// Supplies extra constraints for candidate entries
pub trait ConstraintProvider: Send + Sync + fmt::Debug {
    fn kind(&self) -> ProviderKind;

    /// Constraints applied to the entry's variable
    fn constraints(&self, entry: &Entry) -> Result<Vec<Constraint>, ProviderError>;
}

type ProviderFn = Arc<dyn Fn(&Entry) -> Result<Vec<Constraint>, ProviderError> + Send + Sync>;

/// A provider backed by a closure
#[derive(Clone)]
pub struct FnProvider {
    name: &'static str,
    f: ProviderFn,
}

impl FnProvider {
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&Entry) -> Result<Vec<Constraint>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            name,
            f: Arc::new(f),
        }
    }
}

impl fmt::Debug for FnProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider").field("name", &self.name).finish()
    }
}

impl ConstraintProvider for FnProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Custom(self.name)
    }

    fn constraints(&self, entry: &Entry) -> Result<Vec<Constraint>, ProviderError> {
        (self.f)(entry)
    }
}

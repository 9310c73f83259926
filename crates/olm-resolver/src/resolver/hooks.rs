//! Init hooks that attach the built-in constraint providers

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use super::SatResolver;
use crate::config::ResolverConfig;
use crate::providers::{
    CachedClusterProperties, ClusterProperties, ClusterVersionsGetter, KubeClientConfig,
    KubeClusterVersionClient, PlatformVersionProvider, ProviderKind, RuntimeConstraintsProvider,
};

/// Runs once while the resolver is initializing
pub type InitHook = Box<dyn FnOnce(&mut SatResolver) -> anyhow::Result<()> + Send>;

/// Attach a [`PlatformVersionProvider`] when `enabled`.
///
/// `cluster` is only called when the hook is enabled. The cluster version
/// is fetched once up front; a failure fails initialization.
///
/// # Panics
///
/// Panics if the resolver already has a platform version provider,
/// whether or not the hook is enabled.
pub fn system_constraints_hook<F>(enabled: bool, cluster: F) -> InitHook
where
    F: FnOnce() -> anyhow::Result<Arc<dyn ClusterProperties>> + Send + 'static,
{
    Box::new(move |resolver: &mut SatResolver| -> anyhow::Result<()> {
        if resolver.has_provider(ProviderKind::PlatformVersion) {
            panic!(
                "resolver already has a {} constraint provider defined",
                ProviderKind::PlatformVersion
            );
        }

        if !enabled {
            log::info!("System constraints are off");
            return Ok(());
        }

        let cluster = cluster()?;
        let version = cluster
            .version()
            .context("failed to fetch cluster platform version")?;
        log::info!("System constraints are on, cluster platform version {}", version);

        resolver.attach_provider(Arc::new(PlatformVersionProvider::new(Some(cluster))));
        Ok(())
    })
}

/// Attach a [`RuntimeConstraintsProvider`] reading `path`, if one is set.
///
/// An unreadable file leaves the provider without exclusions; see
/// [`RuntimeConstraintsProvider::load_error`].
pub fn runtime_constraints_hook(path: Option<PathBuf>) -> InitHook {
    Box::new(move |resolver: &mut SatResolver| -> anyhow::Result<()> {
        let Some(path) = path else {
            log::debug!("no runtime constraints configured");
            return Ok(());
        };

        resolver.attach_provider(Arc::new(RuntimeConstraintsProvider::new(path)));
        Ok(())
    })
}

/// Cluster properties backed by the API server in `config`.
///
/// Without an API URL the properties have no client and every lookup
/// fails with `nil client`.
pub fn cluster_properties(config: &ResolverConfig) -> anyhow::Result<Arc<dyn ClusterProperties>> {
    let client: Option<Arc<dyn ClusterVersionsGetter>> = match &config.kube_api_url {
        Some(url) => {
            let mut kube = KubeClientConfig::new(url.as_str());
            kube.token = config.kube_token.clone();
            let client: Arc<dyn ClusterVersionsGetter> = Arc::new(
                KubeClusterVersionClient::new(kube)
                    .with_context(|| format!("failed to create cluster client for {}", url))?,
            );
            Some(client)
        }
        None => None,
    };

    Ok(Arc::new(
        CachedClusterProperties::new(client).with_max_age(config.cluster_version_max_age),
    ))
}

/// The system and runtime constraint hooks, configured from `config`
pub fn default_hooks(config: &ResolverConfig) -> Vec<InitHook> {
    let cluster_config = config.clone();
    vec![
        system_constraints_hook(config.system_constraints, move || {
            cluster_properties(&cluster_config)
        }),
        runtime_constraints_hook(config.runtime_constraints_path.clone()),
    ]
}

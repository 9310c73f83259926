/// Integration tests for configuration driven initialization
///
/// These verify that a resolver configured from environment style
/// variables attaches the expected providers.

use std::fs;
use std::sync::Arc;

use olm_resolver::config::{RUNTIME_CONSTRAINTS_ENV, SYSTEM_CONSTRAINTS_ENV};
use olm_resolver::{
    Cache, ConfigLoader, Entry, InitError, ProviderKind, Request, Requirement, ResolveContext,
    ResolverConfig, ResolverState, SatResolver, Scope, SharedCache,
};
use olm_semver::Version;
use tempfile::TempDir;

fn shared_cache() -> Arc<SharedCache> {
    let cache = Cache::builder(Scope::Global)
        .add(Entry::new("boba-fett", "boba-fett.v1.0.0", Version::new(1, 0, 0)))
        .add(Entry::new("anakin", "anakin.v0.1.1", Version::new(0, 1, 1)))
        .build()
        .unwrap();
    Arc::new(SharedCache::new(cache))
}

#[test]
fn test_nothing_configured() {
    let config = ResolverConfig::load(&ConfigLoader::new(false));
    let resolver = SatResolver::builder(shared_cache())
        .with_config(&config)
        .build()
        .unwrap();

    assert_eq!(resolver.state(), ResolverState::Ready);
    assert!(resolver.provider_kinds().is_empty());
}

#[test]
fn test_runtime_constraints_from_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runtime_constraints.json");
    fs::write(
        &path,
        r#"{"properties": [{"type": "olm.package.required", "value": {"packageName": "boba-fett", "versionRange": ">=0.0.1"}}]}"#,
    )
    .unwrap();

    let loader = ConfigLoader::new(false).with_var(RUNTIME_CONSTRAINTS_ENV, path.to_string_lossy());
    let resolver = SatResolver::builder(shared_cache())
        .with_config(&ResolverConfig::load(&loader))
        .build()
        .unwrap();
    assert_eq!(resolver.provider_kinds(), vec![ProviderKind::RuntimeConstraints]);

    let mut request = Request::new();
    request.require(Requirement::new("boba-fett"));
    assert!(resolver.resolve(&request, &ResolveContext::new()).is_err());

    let mut request = Request::new();
    request.require(Requirement::new("anakin"));
    assert_eq!(resolver.resolve(&request, &ResolveContext::new()).unwrap().len(), 1);
}

#[test]
fn test_unreadable_runtime_constraints_do_not_block_startup() {
    let dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(false)
        .with_var(RUNTIME_CONSTRAINTS_ENV, dir.path().join("missing.json").to_string_lossy());

    let resolver = SatResolver::builder(shared_cache())
        .with_config(&ResolverConfig::load(&loader))
        .build()
        .unwrap();

    let mut request = Request::new();
    request.require(Requirement::new("boba-fett"));
    assert_eq!(resolver.resolve(&request, &ResolveContext::new()).unwrap().len(), 1);
}

#[test]
fn test_system_constraints_without_cluster_fail_init() {
    let loader = ConfigLoader::new(false).with_var(SYSTEM_CONSTRAINTS_ENV, "true");

    let err = SatResolver::builder(shared_cache())
        .with_config(&ResolverConfig::load(&loader))
        .build()
        .unwrap_err();

    let InitError::Hook { index, .. } = &err;
    assert_eq!(*index, 0);
    assert!(err.to_string().contains("nil client"), "{}", err);
}

/// End-to-end resolution tests
///
/// These build a catalog, attach the platform and runtime constraint
/// providers, and check the resulting plans and failure explanations.

use std::io::Write;
use std::sync::Arc;

use olm_resolver::providers::{
    ClusterProperties, PlatformVersionProvider, RuntimeConstraintsProvider, StaticClusterProperties,
};
use olm_resolver::resolver::hooks::system_constraints_hook;
use olm_resolver::{
    Cache, Entry, Predicate, Property, Request, Requirement, ResolveContext, ResolveError,
    SatResolver, Scope, SharedCache,
};
use olm_semver::Version;
use tempfile::NamedTempFile;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn catalog() -> Arc<SharedCache> {
    let cache = Cache::builder(Scope::Namespaced("jedi".to_string()))
        .add(
            Entry::new("anakin", "anakin.v0.1.1", Version::new(0, 1, 1))
                .with_property(Property::max_openshift_version("2.0"))
                .with_source("community", "stable"),
        )
        .add(
            Entry::new("boba-fett", "boba-fett.v1.0.0", Version::new(1, 0, 0))
                .with_source("community", "stable"),
        )
        .add(
            Entry::new("boba-fett", "boba-fett.v2.0.0", Version::new(2, 0, 0))
                .with_source("community", "stable"),
        )
        .build()
        .unwrap();
    Arc::new(SharedCache::new(cache))
}

fn cluster(version: &str) -> Arc<dyn ClusterProperties> {
    Arc::new(StaticClusterProperties::new(Version::parse(version).unwrap()))
}

fn request(package: &str) -> Request {
    let mut request = Request::new();
    request.require(Requirement::new(package));
    request
}

fn names(plan: &olm_resolver::InstallPlan) -> Vec<String> {
    plan.entries().map(|e| e.name.clone()).collect()
}

#[test]
fn test_platform_version_within_ceiling() {
    init_logging();
    let resolver = SatResolver::builder(catalog())
        .with_init_hook(system_constraints_hook(true, || Ok(cluster("1.0.0"))))
        .build()
        .unwrap();

    let plan = resolver.resolve(&request("anakin"), &ResolveContext::new()).unwrap();
    assert_eq!(names(&plan), vec!["anakin.v0.1.1"]);
}

#[test]
fn test_platform_version_above_ceiling() {
    init_logging();
    let resolver = SatResolver::builder(catalog())
        .with_provider(Arc::new(PlatformVersionProvider::new(Some(cluster("3.0.0")))))
        .build()
        .unwrap();

    let err = resolver
        .resolve(&request("anakin"), &ResolveContext::new())
        .unwrap_err();
    assert!(matches!(err, ResolveError::NotSatisfiable(_)));

    let prohibited = err
        .explanations()
        .into_iter()
        .find(|e| e.contains("bundle incompatible with openshift cluster"))
        .expect("platform explanation");
    assert!(prohibited.contains("2.0"), "{}", prohibited);
    assert!(prohibited.contains("3.0"), "{}", prohibited);
    assert_eq!(
        prohibited,
        "anakin.v0.1.1: bundle incompatible with openshift cluster, \"olm.maxOpenShiftVersion\" < cluster version: (2.0 < 3.0)"
    );
}

#[test]
fn test_patch_level_is_ignored() {
    init_logging();
    let resolver = SatResolver::builder(catalog())
        .with_provider(Arc::new(PlatformVersionProvider::new(Some(cluster("2.0.9")))))
        .build()
        .unwrap();

    let plan = resolver.resolve(&request("anakin"), &ResolveContext::new()).unwrap();
    assert_eq!(names(&plan), vec!["anakin.v0.1.1"]);
}

#[test]
fn test_runtime_constraints_exclude_package() {
    init_logging();
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"{"properties": [{"type": "olm.package.required", "value": {"packageName": "boba-fett", "versionRange": ">=1.0.0"}}]}"#,
    )
    .unwrap();

    let resolver = SatResolver::builder(catalog())
        .with_provider(Arc::new(RuntimeConstraintsProvider::load(file.path()).unwrap()))
        .build()
        .unwrap();

    let err = resolver
        .resolve(&request("boba-fett"), &ResolveContext::new())
        .unwrap_err();
    assert!(
        err.explanations()
            .iter()
            .any(|e| e.ends_with("excluded by runtime constraint: with package: boba-fett")),
        "{:?}",
        err.explanations()
    );

    let plan = resolver.resolve(&request("anakin"), &ResolveContext::new()).unwrap();
    assert_eq!(names(&plan), vec!["anakin.v0.1.1"]);
}

#[test]
fn test_every_requirement_on_a_package_applies() {
    init_logging();
    let resolver = SatResolver::builder(catalog()).build().unwrap();

    let mut request = Request::new();
    request
        .require(Requirement::new("anakin"))
        .require(Requirement::new("anakin").predicate(Predicate::custom("never", |_| false)));

    let err = resolver.resolve(&request, &ResolveContext::new()).unwrap_err();
    assert!(matches!(err, ResolveError::NotSatisfiable(_)));
    assert!(
        err.explanations()
            .iter()
            .any(|e| e == "no operators found with package: anakin and never"),
        "{:?}",
        err.explanations()
    );

    let mut request = Request::new();
    let major_one = Predicate::custom("major version 1", |e| e.version.major == 1);
    request
        .require(Requirement::new("boba-fett"))
        .require(Requirement::new("boba-fett").predicate(major_one));

    let plan = resolver.resolve(&request, &ResolveContext::new()).unwrap();
    assert_eq!(names(&plan), vec!["boba-fett.v1.0.0"]);
}

#[test]
fn test_concurrent_resolution() {
    init_logging();
    let resolver = Arc::new(
        SatResolver::builder(catalog())
            .with_provider(Arc::new(PlatformVersionProvider::new(Some(cluster("1.0.0")))))
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = ["anakin", "boba-fett", "anakin", "boba-fett"]
        .into_iter()
        .map(|package| {
            let resolver = resolver.clone();
            std::thread::spawn(move || {
                resolver
                    .resolve(&request(package), &ResolveContext::new())
                    .map(|plan| names(&plan))
            })
        })
        .collect();

    for handle in handles {
        let plan = handle.join().unwrap().unwrap();
        assert_eq!(plan.len(), 1);
    }
}

#[test]
#[should_panic(expected = "resolver already has a platform version constraint provider defined")]
fn test_second_platform_provider_panics() {
    let _ = SatResolver::builder(catalog())
        .with_provider(Arc::new(PlatformVersionProvider::new(Some(cluster("1.0.0")))))
        .with_init_hook(system_constraints_hook(false, || Ok(cluster("1.0.0"))))
        .build();
}

use std::fmt;

use olm_semver::Version;

use super::property::{Gvk, LabelValue, Property, GVK_TYPE, LABEL_TYPE};

/// Where an entry was found
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceInfo {
    pub catalog: String,
    pub channel: String,
}

/// An installable bundle as seen by the resolver.
///
/// Entries are shared as `Arc<Entry>` and never mutated once they are in
/// a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Bundle name, e.g. `etcdoperator.v0.9.4`
    pub name: String,
    pub package: String,
    pub version: Version,
    pub properties: Vec<Property>,
    /// Required properties, e.g. `olm.gvk.required`
    pub dependencies: Vec<Property>,
    /// Required-shaped properties naming what cannot be installed alongside
    pub conflicts: Vec<Property>,
    pub source: SourceInfo,
    pub replaces: Option<String>,
}

impl Entry {
    /// Create an entry that declares its own `olm.package` property
    pub fn new(package: impl Into<String>, name: impl Into<String>, version: Version) -> Self {
        let package = package.into();
        let identity = Property::package(&package, &version.to_string());
        Self {
            name: name.into(),
            package,
            version,
            properties: vec![identity],
            dependencies: Vec::new(),
            conflicts: Vec::new(),
            source: SourceInfo::default(),
            replaces: None,
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_dependency(mut self, dependency: Property) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_conflict(mut self, conflict: Property) -> Self {
        self.conflicts.push(conflict);
        self
    }

    pub fn with_source(mut self, catalog: impl Into<String>, channel: impl Into<String>) -> Self {
        self.source = SourceInfo {
            catalog: catalog.into(),
            channel: channel.into(),
        };
        self
    }

    pub fn with_replaces(mut self, replaces: impl Into<String>) -> Self {
        self.replaces = Some(replaces.into());
        self
    }

    /// Properties of one type
    pub fn properties_of_type<'a>(
        &'a self,
        property_type: &'a str,
    ) -> impl Iterator<Item = &'a Property> + 'a {
        self.properties.iter().filter(move |p| p.is(property_type))
    }

    /// APIs provided by the entry; malformed `olm.gvk` payloads are skipped
    pub fn provided_gvks(&self) -> Vec<Gvk> {
        self.properties_of_type(GVK_TYPE)
            .filter_map(|p| match p.parse_value::<Gvk>() {
                Ok(gvk) => Some(gvk),
                Err(e) => {
                    log::trace!("skipping malformed {} property on {}: {}", GVK_TYPE, self.name, e);
                    None
                }
            })
            .collect()
    }

    /// Labels of the entry; malformed `olm.label` payloads are skipped
    pub fn labels(&self) -> Vec<String> {
        self.properties_of_type(LABEL_TYPE)
            .filter_map(|p| p.parse_value::<LabelValue>().ok())
            .map(|l| l.label)
            .collect()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.package, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::property::PACKAGE_TYPE;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_new_declares_package_property() {
        let entry = Entry::new("etcd", "etcdoperator.v0.9.4", v("0.9.4"));
        assert_eq!(entry.properties_of_type(PACKAGE_TYPE).count(), 1);
        assert_eq!(entry.to_string(), "etcdoperator.v0.9.4 (etcd 0.9.4)");
    }

    #[test]
    fn test_provided_gvks_skips_malformed() {
        let entry = Entry::new("etcd", "etcdoperator.v0.9.4", v("0.9.4"))
            .with_property(Property::gvk("etcd.database.coreos.com", "v1beta2", "EtcdCluster"))
            .with_property(Property::new(GVK_TYPE, "not json"));

        assert_eq!(
            entry.provided_gvks(),
            vec![Gvk::new("etcd.database.coreos.com", "v1beta2", "EtcdCluster")]
        );
    }

    #[test]
    fn test_labels() {
        let entry = Entry::new("etcd", "etcdoperator.v0.9.4", v("0.9.4"))
            .with_property(Property::label("stable"))
            .with_property(Property::new(LABEL_TYPE, "{}"));

        assert_eq!(entry.labels(), vec!["stable".to_string()]);
    }
}

use std::fmt;
use std::sync::Arc;

use olm_semver::{Version, VersionRange};

use super::entry::Entry;
use super::property::{
    Gvk, LabelValue, PackageRequired, Property, GVK_REQUIRED_TYPE, LABEL_REQUIRED_TYPE,
    PACKAGE_REQUIRED_TYPE,
};

type TestFn = Arc<dyn Fn(&Entry) -> bool + Send + Sync>;

/// A boolean test over cache entries.
///
/// Predicates never fail: an entry that lacks (or carries a malformed
/// version of) whatever is being tested simply does not match.
#[derive(Clone)]
pub enum Predicate {
    /// Package name equality
    Package(String),
    /// Channel the entry was found in
    Channel(String),
    /// Catalog the entry was found in
    Catalog(String),
    /// Presence of an `olm.label` with this value
    Label(String),
    /// Entry version within a range
    VersionRange(VersionRange),
    /// Entry version at or below a ceiling
    VersionCeiling(Version),
    /// Entry provides this API
    ProvidesGvk(Gvk),
    /// Entry belongs to the package with a version in range
    ProvidesPackage { name: String, range: VersionRange },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Ad hoc test with a description
    Custom { description: String, test: TestFn },
}

impl Predicate {
    /// Wrap a closure
    pub fn custom<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Entry) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    pub fn test(&self, entry: &Entry) -> bool {
        match self {
            Predicate::Package(name) => entry.package == *name,
            Predicate::Channel(channel) => entry.source.channel == *channel,
            Predicate::Catalog(catalog) => entry.source.catalog == *catalog,
            Predicate::Label(label) => entry.labels().iter().any(|l| l == label),
            Predicate::VersionRange(range) => range.matches(&entry.version),
            Predicate::VersionCeiling(ceiling) => {
                entry.version.cmp_precedence(ceiling) != std::cmp::Ordering::Greater
            }
            Predicate::ProvidesGvk(gvk) => entry.provided_gvks().contains(gvk),
            Predicate::ProvidesPackage { name, range } => {
                entry.package == *name && range.matches(&entry.version)
            }
            Predicate::And(all) => all.iter().all(|p| p.test(entry)),
            Predicate::Or(any) => any.iter().any(|p| p.test(entry)),
            Predicate::Not(inner) => !inner.test(entry),
            Predicate::Custom { test, .. } => test(entry),
        }
    }

    /// Translate a required property into the predicate its providers match.
    ///
    /// Returns `Ok(None)` for property types that carry no requirement and
    /// `Err` with a reason when the payload is malformed.
    pub fn from_requirement(property: &Property) -> Result<Option<Predicate>, String> {
        match property.property_type.as_str() {
            PACKAGE_REQUIRED_TYPE => {
                let required: PackageRequired =
                    property.parse_value().map_err(|e| e.to_string())?;
                let range = match required.version_range.as_deref() {
                    Some(range) if !range.trim().is_empty() => {
                        VersionRange::parse(range).map_err(|e| e.to_string())?
                    }
                    _ => VersionRange::any(),
                };
                Ok(Some(Predicate::ProvidesPackage {
                    name: required.package_name,
                    range,
                }))
            }
            GVK_REQUIRED_TYPE => {
                let gvk: Gvk = property.parse_value().map_err(|e| e.to_string())?;
                Ok(Some(Predicate::ProvidesGvk(gvk)))
            }
            LABEL_REQUIRED_TYPE => {
                let label: LabelValue = property.parse_value().map_err(|e| e.to_string())?;
                Ok(Some(Predicate::Label(label.label)))
            }
            _ => Ok(None),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, predicates: &[Predicate], sep: &str) -> fmt::Result {
    for (i, p) in predicates.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", p)?;
    }
    Ok(())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Package(name) => write!(f, "with package: {}", name),
            Predicate::Channel(channel) => write!(f, "with channel: {}", channel),
            Predicate::Catalog(catalog) => write!(f, "from catalog: {}", catalog),
            Predicate::Label(label) => write!(f, "with label: {}", label),
            Predicate::VersionRange(range) => write!(f, "with version in range: {}", range),
            Predicate::VersionCeiling(ceiling) => write!(f, "with version <= {}", ceiling),
            Predicate::ProvidesGvk(gvk) => write!(
                f,
                "exporting an API with group: {}, version: {}, kind: {}",
                gvk.group, gvk.version, gvk.kind
            ),
            Predicate::ProvidesPackage { name, range } => {
                write!(f, "with package: {} with version in range: {}", name, range)
            }
            Predicate::And(all) => join(f, all, " and "),
            Predicate::Or(any) => join(f, any, " or "),
            Predicate::Not(inner) => write!(f, "not ({})", inner),
            Predicate::Custom { description, .. } => f.write_str(description),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self)
    }
}

use std::fmt;
use std::sync::Arc;

use olm_semver::VersionRange;

use crate::cache::{Entry, Predicate};
use crate::solver::Identifier;

/// One package the caller wants installed
#[derive(Debug, Clone)]
pub struct Requirement {
    pub package: String,
    pub channel: Option<String>,
    pub catalog: Option<String>,
    pub version_range: Option<VersionRange>,
    /// Additional filters on top of the base predicates
    pub predicates: Vec<Predicate>,
}

impl Requirement {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            channel: None,
            catalog: None,
            version_range: None,
            predicates: Vec::new(),
        }
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn version_range(mut self, range: VersionRange) -> Self {
        self.version_range = Some(range);
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Predicates a candidate has to satisfy, package first
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = vec![Predicate::Package(self.package.clone())];
        if let Some(channel) = &self.channel {
            predicates.push(Predicate::Channel(channel.clone()));
        }
        if let Some(catalog) = &self.catalog {
            predicates.push(Predicate::Catalog(catalog.clone()));
        }
        if let Some(range) = &self.version_range {
            predicates.push(Predicate::VersionRange(range.clone()));
        }
        predicates.extend(self.predicates.iter().cloned());
        predicates
    }

    pub(crate) fn identifier(&self) -> Identifier {
        Identifier::new(format!("request/{}", self))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.package)?;
        if let Some(channel) = &self.channel {
            write!(f, "@{}", channel)?;
        }
        if let Some(catalog) = &self.catalog {
            write!(f, " from {}", catalog)?;
        }
        if let Some(range) = &self.version_range {
            write!(f, " {}", range)?;
        }
        if !self.predicates.is_empty() {
            let extra: Vec<String> = self.predicates.iter().map(|p| p.to_string()).collect();
            write!(f, " ({})", extra.join(" and "))?;
        }
        Ok(())
    }
}

/// What a resolution has to satisfy.
///
/// Installed entries are kept at the same or a newer version; they are
/// reported as upgrades when the resolution picks a newer bundle.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub requirements: Vec<Requirement>,
    pub installed: Vec<Arc<Entry>>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement
    pub fn require(&mut self, requirement: Requirement) -> &mut Self {
        self.requirements.push(requirement);
        self
    }

    /// Record an entry that is already installed
    pub fn installed(&mut self, entry: Arc<Entry>) -> &mut Self {
        self.installed.push(entry);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.installed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_predicates() {
        let requirement = Requirement::new("etcd")
            .channel("alpha")
            .version_range(VersionRange::parse(">=0.9.0").unwrap());

        let rendered: Vec<String> = requirement
            .predicates()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "with package: etcd",
                "with channel: alpha",
                "with version in range: >=0.9.0"
            ]
        );
        assert_eq!(requirement.to_string(), "etcd@alpha >=0.9.0");
        assert_eq!(requirement.identifier().as_str(), "request/etcd@alpha >=0.9.0");
    }

    #[test]
    fn test_custom_predicates_are_rendered() {
        let requirement = Requirement::new("etcd")
            .predicate(Predicate::custom("never", |_| false))
            .predicate(Predicate::Label("tier=db".to_string()));

        assert_eq!(requirement.to_string(), "etcd (never and with label: tier=db)");
        assert_ne!(requirement.identifier(), Requirement::new("etcd").identifier());
    }

    #[test]
    fn test_request_builder() {
        let mut request = Request::new();
        assert!(request.is_empty());

        request
            .require(Requirement::new("etcd"))
            .require(Requirement::new("prometheus"));
        assert_eq!(request.requirements.len(), 2);
        assert!(request.installed.is_empty());
    }
}

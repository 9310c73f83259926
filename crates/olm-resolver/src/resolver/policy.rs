use std::cmp::Ordering;
use std::sync::Arc;

use crate::cache::Entry;

/// Policy for ordering candidate entries.
///
/// The solver tries candidates in the order given here, so the first
/// candidate wins whenever the rest of the constraints allow it.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Prefer lowest versions (for testing)
    pub prefer_lowest: bool,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set preference for lowest versions
    pub fn prefer_lowest(mut self, prefer: bool) -> Self {
        self.prefer_lowest = prefer;
        self
    }

    /// Sort candidates best first.
    ///
    /// Entries from `preferred_catalog` come first, then newer versions
    /// (older with `prefer_lowest`), then package and bundle name.
    pub fn sort_candidates(&self, candidates: &mut [Arc<Entry>], preferred_catalog: Option<&str>) {
        candidates.sort_by(|a, b| self.compare(a, b, preferred_catalog));
    }

    fn compare(&self, a: &Entry, b: &Entry, preferred_catalog: Option<&str>) -> Ordering {
        if let Some(catalog) = preferred_catalog {
            let a_local = a.source.catalog == catalog;
            let b_local = b.source.catalog == catalog;
            if a_local != b_local {
                return if a_local { Ordering::Less } else { Ordering::Greater };
            }
        }

        let by_version = if self.prefer_lowest {
            a.version.cmp(&b.version)
        } else {
            b.version.cmp(&a.version)
        };

        by_version
            .then_with(|| a.package.cmp(&b.package))
            .then_with(|| a.name.cmp(&b.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olm_semver::Version;

    fn entry(package: &str, version: &str, catalog: &str) -> Arc<Entry> {
        Arc::new(
            Entry::new(
                package,
                format!("{}.v{}", package, version),
                Version::parse(version).unwrap(),
            )
            .with_source(catalog, "stable"),
        )
    }

    fn names(entries: &[Arc<Entry>]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_newest_first() {
        let mut candidates = vec![
            entry("etcd", "0.9.0", "community"),
            entry("etcd", "0.9.4", "community"),
            entry("etcd", "0.9.2", "community"),
        ];
        Policy::new().sort_candidates(&mut candidates, None);
        assert_eq!(names(&candidates), vec!["etcd.v0.9.4", "etcd.v0.9.2", "etcd.v0.9.0"]);
    }

    #[test]
    fn test_prefer_lowest() {
        let mut candidates = vec![
            entry("etcd", "0.9.4", "community"),
            entry("etcd", "0.9.0", "community"),
        ];
        Policy::new().prefer_lowest(true).sort_candidates(&mut candidates, None);
        assert_eq!(names(&candidates), vec!["etcd.v0.9.0", "etcd.v0.9.4"]);
    }

    #[test]
    fn test_preferred_catalog_first() {
        let mut candidates = vec![
            entry("etcd", "0.9.4", "community"),
            entry("etcd-fork", "0.1.0", "redhat"),
        ];
        Policy::new().sort_candidates(&mut candidates, Some("redhat"));
        assert_eq!(names(&candidates), vec!["etcd-fork.v0.1.0", "etcd.v0.9.4"]);
    }
}

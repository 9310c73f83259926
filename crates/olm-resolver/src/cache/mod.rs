//! Catalog cache: immutable entries queried with predicates

mod entry;
mod predicate;
pub mod property;

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use olm_semver::Version;
use thiserror::Error;

pub use entry::{Entry, SourceInfo};
pub use predicate::Predicate;
pub use property::{Gvk, Property};

/// Errors raised while building a cache
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("duplicate entry {name} for package {package} at version {version}")]
    DuplicateEntry {
        package: String,
        name: String,
        version: Version,
    },
}

/// Which catalogs a cache was populated from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Catalogs visible to one namespace
    Namespaced(String),
    /// Catalogs visible cluster-wide
    Global,
}

/// An immutable snapshot of catalog entries.
///
/// Entries are kept ordered by package name, then version (newest first),
/// then bundle name; every query returns them in that order.
#[derive(Debug, Clone)]
pub struct Cache {
    scope: Scope,
    entries: Vec<Arc<Entry>>,
    /// Package name -> positions in `entries`
    packages: IndexMap<String, Vec<usize>>,
}

impl Cache {
    pub fn builder(scope: Scope) -> CacheBuilder {
        CacheBuilder::new(scope)
    }

    pub fn empty(scope: Scope) -> Self {
        Self {
            scope,
            entries: Vec::new(),
            packages: IndexMap::new(),
        }
    }

    /// All entries satisfying every predicate
    pub fn find(&self, predicates: &[Predicate]) -> Vec<Arc<Entry>> {
        // Narrow to one package when the first predicate names it
        let candidates: Box<dyn Iterator<Item = &Arc<Entry>>> = match predicates.first() {
            Some(Predicate::Package(name)) => Box::new(
                self.packages
                    .get(name)
                    .into_iter()
                    .flatten()
                    .map(|&i| &self.entries[i]),
            ),
            _ => Box::new(self.entries.iter()),
        };

        candidates
            .filter(|entry| predicates.iter().all(|p| p.test(entry)))
            .cloned()
            .collect()
    }

    /// Look up an entry by package and bundle name
    pub fn get(&self, package: &str, name: &str) -> Option<Arc<Entry>> {
        self.packages
            .get(package)?
            .iter()
            .map(|&i| &self.entries[i])
            .find(|e| e.name == name)
            .cloned()
    }

    /// Package names, sorted
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.entries.iter()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects entries and builds a [`Cache`]
#[derive(Debug)]
pub struct CacheBuilder {
    scope: Scope,
    entries: Vec<Arc<Entry>>,
}

impl CacheBuilder {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            entries: Vec::new(),
        }
    }

    pub fn add(mut self, entry: Entry) -> Self {
        self.entries.push(Arc::new(entry));
        self
    }

    pub fn extend(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.entries.extend(entries.into_iter().map(Arc::new));
        self
    }

    pub fn build(self) -> Result<Cache, CacheError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert((&entry.package, &entry.name, &entry.version)) {
                return Err(CacheError::DuplicateEntry {
                    package: entry.package.clone(),
                    name: entry.name.clone(),
                    version: entry.version.clone(),
                });
            }
        }

        let mut entries = self.entries;
        entries.sort_by(|a, b| {
            a.package
                .cmp(&b.package)
                .then_with(|| b.version.cmp(&a.version))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut packages: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (i, entry) in entries.iter().enumerate() {
            packages.entry(entry.package.clone()).or_default().push(i);
        }

        log::debug!("built cache with {} entries in {} packages", entries.len(), packages.len());

        Ok(Cache {
            scope: self.scope,
            entries,
            packages,
        })
    }
}

/// A cache handle whose snapshot can be swapped atomically.
///
/// Readers take an `Arc` to the current snapshot and keep using it even
/// if it is replaced while they work.
#[derive(Debug)]
pub struct SharedCache {
    current: RwLock<Arc<Cache>>,
}

impl SharedCache {
    pub fn new(cache: Cache) -> Self {
        Self {
            current: RwLock::new(Arc::new(cache)),
        }
    }

    pub fn snapshot(&self) -> Arc<Cache> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the snapshot, returning the previous one
    pub fn replace(&self, cache: Cache) -> Arc<Cache> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(cache))
    }
}

//! Translates a request into solver variables

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;

use super::policy::Policy;
use super::request::Request;
use crate::cache::{Cache, Entry, Predicate};
use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::providers::ConstraintProvider;
use crate::solver::{join, Constraint, Identifier, Variable};

/// Solver input for one resolution
#[derive(Debug, Default)]
pub(crate) struct Assembly {
    /// Synthetic variables first, then entry variables in discovery order
    pub variables: Vec<Variable>,
    /// Every candidate entry by variable identifier
    pub entries: IndexMap<Identifier, Arc<Entry>>,
    /// Candidate lists of each declared dependency, per entry, best first
    pub dependencies: IndexMap<Identifier, Vec<Vec<Identifier>>>,
}

impl Assembly {
    pub fn entry(&self, id: &Identifier) -> Option<&Arc<Entry>> {
        self.entries.get(id)
    }
}

/// Gathers candidates and builds constraints for a request
pub(crate) struct Assembler<'a> {
    cache: &'a Cache,
    providers: &'a [Arc<dyn ConstraintProvider>],
    policy: &'a Policy,
    ctx: &'a ResolveContext,
}

impl<'a> Assembler<'a> {
    pub fn new(
        cache: &'a Cache,
        providers: &'a [Arc<dyn ConstraintProvider>],
        policy: &'a Policy,
        ctx: &'a ResolveContext,
    ) -> Self {
        Self {
            cache,
            providers,
            policy,
            ctx,
        }
    }

    pub fn assemble(&self, request: &Request) -> Result<Assembly, ResolveError> {
        let mut assembly = Assembly::default();
        let mut queue: VecDeque<Arc<Entry>> = VecDeque::new();

        let mut synthetic: Vec<Variable> = Vec::new();
        let mut seen: HashSet<Identifier> = HashSet::new();

        for requirement in &request.requirements {
            let base = requirement.identifier();
            let mut id = base.clone();
            let mut occurrence = 1;
            while !seen.insert(id.clone()) {
                occurrence += 1;
                id = Identifier::new(format!("{}#{}", base, occurrence));
            }

            let predicates = requirement.predicates();
            let mut candidates = self.cache.find(&predicates);
            self.policy
                .sort_candidates(&mut candidates, requirement.catalog.as_deref());
            log::debug!("{} candidate(s) for {}", candidates.len(), requirement);

            let targets: Vec<Identifier> = candidates
                .iter()
                .map(|c| visit(c, &mut assembly, &mut queue))
                .collect();

            let dependency = if targets.is_empty() {
                Constraint::dependency(targets)
                    .with_explanation(format!("no operators found {}", describe(&predicates)))
            } else {
                Constraint::dependency(targets)
            };

            synthetic.push(
                Variable::new(id)
                    .with_constraint(
                        Constraint::mandatory()
                            .with_explanation(format!("{} is requested", requirement)),
                    )
                    .with_constraint(dependency),
            );
        }

        for installed in &request.installed {
            let id = Identifier::new(format!("installed/{}", installed.package));
            if !seen.insert(id.clone()) {
                log::debug!(
                    "ignoring second installed entry {} for package {}",
                    installed.name,
                    installed.package
                );
                continue;
            }

            let mut candidates: Vec<Arc<Entry>> = self
                .cache
                .find(&[Predicate::Package(installed.package.clone())])
                .into_iter()
                .filter(|c| c.version >= installed.version)
                .collect();
            let installed_id = Identifier::for_entry(installed);
            if !candidates.iter().any(|c| Identifier::for_entry(c) == installed_id) {
                candidates.push(installed.clone());
            }
            self.policy
                .sort_candidates(&mut candidates, Some(installed.source.catalog.as_str()));

            let targets: Vec<Identifier> = candidates
                .iter()
                .map(|c| visit(c, &mut assembly, &mut queue))
                .collect();

            synthetic.push(
                Variable::new(id)
                    .with_constraint(
                        Constraint::mandatory()
                            .with_explanation(format!("{} is installed", installed.name)),
                    )
                    .with_constraint(Constraint::dependency(targets.clone()).with_explanation(
                        format!(
                            "installed package {} requires at least one of {}",
                            installed.package,
                            join(&targets)
                        ),
                    )),
            );
        }

        let mut variables: IndexMap<Identifier, Variable> = IndexMap::new();
        while let Some(entry) = queue.pop_front() {
            self.ctx.check()?;

            let id = Identifier::for_entry(&entry);
            let mut variable = Variable::new(id.clone());

            for provider in self.providers {
                let constraints =
                    provider
                        .constraints(&entry)
                        .map_err(|source| ResolveError::Provider {
                            kind: provider.kind(),
                            entry: entry.name.clone(),
                            source,
                        })?;
                variable.extend(constraints.into_iter().map(|c| attribute(c, &entry)));
            }

            let mut dependency_targets = Vec::new();
            for dependency in &entry.dependencies {
                let predicate = match Predicate::from_requirement(dependency) {
                    Ok(Some(predicate)) => predicate,
                    Ok(None) => {
                        log::trace!(
                            "{} declares dependency of unknown type {}",
                            entry.name,
                            dependency.property_type
                        );
                        continue;
                    }
                    Err(reason) => {
                        variable.add_constraint(Constraint::prohibited().with_explanation(format!(
                            "{} has an invalid {} dependency: {}",
                            entry.name, dependency.property_type, reason
                        )));
                        continue;
                    }
                };

                let mut candidates = self.cache.find(std::slice::from_ref(&predicate));
                self.policy
                    .sort_candidates(&mut candidates, Some(entry.source.catalog.as_str()));

                let targets: Vec<Identifier> = candidates
                    .iter()
                    .map(|c| visit(c, &mut assembly, &mut queue))
                    .collect();
                if targets.is_empty() {
                    log::debug!("no candidates for dependency of {} {}", entry.name, predicate);
                }

                let explanation = format!("{} requires an operator {}", entry.name, predicate);
                variable.add_constraint(
                    Constraint::dependency(targets.clone()).with_explanation(explanation),
                );
                dependency_targets.push(targets);
            }

            assembly.dependencies.insert(id.clone(), dependency_targets);
            variables.insert(id, variable);
        }

        self.add_conflicts(&assembly, &mut variables);

        assembly.variables = synthetic;
        assembly.variables.extend(variables.into_values());
        assembly.variables.extend(uniqueness(&assembly.entries));

        log::debug!(
            "assembled {} variables for {} candidate entries",
            assembly.variables.len(),
            assembly.entries.len()
        );

        Ok(assembly)
    }

    /// Declared conflicts only apply to entries already among the candidates
    fn add_conflicts(&self, assembly: &Assembly, variables: &mut IndexMap<Identifier, Variable>) {
        for (id, entry) in &assembly.entries {
            for conflict in &entry.conflicts {
                let predicate = match Predicate::from_requirement(conflict) {
                    Ok(Some(predicate)) => predicate,
                    Ok(None) => continue,
                    Err(reason) => {
                        log::debug!("ignoring malformed conflict on {}: {}", entry.name, reason);
                        continue;
                    }
                };

                for (other_id, other) in &assembly.entries {
                    if other_id == id || !predicate.test(other) {
                        continue;
                    }
                    if let Some(variable) = variables.get_mut(id) {
                        let explanation =
                            format!("{} conflicts with {} {}", entry.name, other.name, predicate);
                        variable.add_constraint(
                            Constraint::conflict(other_id.clone()).with_explanation(explanation),
                        );
                    }
                }
            }
        }
    }
}

/// Register a candidate, queueing it for expansion the first time it is seen
fn visit(
    entry: &Arc<Entry>,
    assembly: &mut Assembly,
    queue: &mut VecDeque<Arc<Entry>>,
) -> Identifier {
    let id = Identifier::for_entry(entry);
    if !assembly.entries.contains_key(&id) {
        assembly.entries.insert(id.clone(), entry.clone());
        queue.push_back(entry.clone());
    }
    id
}

/// Name the entry in a provider's explanation
fn attribute(constraint: Constraint, entry: &Entry) -> Constraint {
    match constraint.explanation() {
        Some(explanation) => {
            let explanation = format!("{}: {}", entry.name, explanation);
            Constraint::new(constraint.kind().clone()).with_explanation(explanation)
        }
        None => constraint,
    }
}

fn describe(predicates: &[Predicate]) -> String {
    predicates
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// At most one bundle per package, and one provider per API across packages
fn uniqueness(entries: &IndexMap<Identifier, Arc<Entry>>) -> Vec<Variable> {
    let mut packages: IndexMap<&str, Vec<Identifier>> = IndexMap::new();
    let mut apis: IndexMap<String, Vec<(&str, Identifier)>> = IndexMap::new();

    for (id, entry) in entries {
        packages
            .entry(entry.package.as_str())
            .or_default()
            .push(id.clone());
        for gvk in entry.provided_gvks() {
            apis.entry(gvk.to_string())
                .or_default()
                .push((entry.package.as_str(), id.clone()));
        }
    }

    let mut variables = Vec::new();
    for (package, members) in packages {
        if members.len() < 2 {
            continue;
        }
        let explanation = format!("package {} permits at most 1 of {}", package, join(&members));
        variables.push(
            Variable::new(Identifier::new(format!("unique/package/{}", package)))
                .with_constraint(Constraint::at_most_one(members).with_explanation(explanation)),
        );
    }

    for (api, providers) in apis {
        let first = providers[0].0;
        if providers.iter().all(|(package, _)| *package == first) {
            continue;
        }
        let members: Vec<Identifier> = providers.into_iter().map(|(_, id)| id).collect();
        let explanation = format!("API {} permits at most 1 of {}", api, join(&members));
        variables.push(
            Variable::new(Identifier::new(format!("unique/gvk/{}", api)))
                .with_constraint(Constraint::at_most_one(members).with_explanation(explanation)),
        );
    }

    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Property, Scope};
    use crate::providers::{FnProvider, ProviderError};
    use crate::resolver::request::Requirement;
    use crate::solver::ConstraintKind;
    use olm_semver::Version;

    fn entry(package: &str, version: &str) -> Entry {
        Entry::new(package, format!("{}.v{}", package, version), Version::parse(version).unwrap())
            .with_source("community", "stable")
    }

    fn assemble(
        cache: &Cache,
        providers: &[Arc<dyn ConstraintProvider>],
        request: &Request,
    ) -> Assembly {
        let policy = Policy::new();
        let ctx = ResolveContext::new();
        Assembler::new(cache, providers, &policy, &ctx)
            .assemble(request)
            .unwrap()
    }

    fn variable<'a>(assembly: &'a Assembly, id: &str) -> &'a Variable {
        assembly
            .variables
            .iter()
            .find(|v| v.id().as_str() == id)
            .unwrap()
    }

    #[test]
    fn test_requirement_variable() {
        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.0"))
            .add(entry("etcd", "0.9.4"))
            .build()
            .unwrap();
        let mut request = Request::new();
        request.require(Requirement::new("etcd"));

        let assembly = assemble(&cache, &[], &request);
        let requested = variable(&assembly, "request/etcd");
        assert_eq!(requested.constraints()[0].kind(), &ConstraintKind::Mandatory);
        assert_eq!(
            requested.constraints()[1].kind(),
            &ConstraintKind::Dependency(vec![
                Identifier::from("etcd/etcd.v0.9.4/0.9.4"),
                Identifier::from("etcd/etcd.v0.9.0/0.9.0"),
            ])
        );

        let unique = variable(&assembly, "unique/package/etcd");
        assert!(matches!(
            unique.constraints()[0].kind(),
            ConstraintKind::AtMostOne(m) if m.len() == 2
        ));
    }

    #[test]
    fn test_repeated_requirements_each_get_a_variable() {
        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.4"))
            .build()
            .unwrap();
        let mut request = Request::new();
        request
            .require(Requirement::new("etcd"))
            .require(Requirement::new("etcd"))
            .require(Requirement::new("etcd").predicate(Predicate::custom("never", |_| false)));

        let assembly = assemble(&cache, &[], &request);
        assert!(matches!(
            variable(&assembly, "request/etcd#2").constraints()[1].kind(),
            ConstraintKind::Dependency(targets) if targets.len() == 1
        ));
        assert_eq!(
            variable(&assembly, "request/etcd (never)").constraints()[1].kind(),
            &ConstraintKind::Dependency(vec![])
        );
    }

    #[test]
    fn test_requirement_without_candidates() {
        let cache = Cache::empty(Scope::Global);
        let mut request = Request::new();
        request.require(Requirement::new("boba-fett"));

        let assembly = assemble(&cache, &[], &request);
        let dependency = &variable(&assembly, "request/boba-fett").constraints()[1];
        assert_eq!(dependency.kind(), &ConstraintKind::Dependency(vec![]));
        assert_eq!(dependency.explanation(), Some("no operators found with package: boba-fett"));
    }

    #[test]
    fn test_dependencies_are_expanded() {
        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.4").with_dependency(Property::gvk_required(
                "etcd.database.coreos.com",
                "v1",
                "Backup",
            )))
            .add(entry("backup", "1.0.0").with_property(Property::gvk(
                "etcd.database.coreos.com",
                "v1",
                "Backup",
            )))
            .add(entry("unrelated", "1.0.0"))
            .build()
            .unwrap();
        let mut request = Request::new();
        request.require(Requirement::new("etcd"));

        let assembly = assemble(&cache, &[], &request);
        assert_eq!(assembly.entries.len(), 2);

        let etcd = variable(&assembly, "etcd/etcd.v0.9.4/0.9.4");
        assert_eq!(
            etcd.constraints()[0].kind(),
            &ConstraintKind::Dependency(vec![Identifier::from("backup/backup.v1.0.0/1.0.0")])
        );
        assert_eq!(
            etcd.constraints()[0].explanation(),
            Some("etcd.v0.9.4 requires an operator exporting an API with group: etcd.database.coreos.com, version: v1, kind: Backup")
        );
    }

    #[test]
    fn test_malformed_dependency_prohibits_entry() {
        let cache = Cache::builder(Scope::Global)
            .add(
                entry("etcd", "0.9.4")
                    .with_dependency(Property::new("olm.gvk.required", "\"Backup\"")),
            )
            .build()
            .unwrap();
        let mut request = Request::new();
        request.require(Requirement::new("etcd"));

        let assembly = assemble(&cache, &[], &request);
        let etcd = variable(&assembly, "etcd/etcd.v0.9.4/0.9.4");
        assert_eq!(etcd.constraints()[0].kind(), &ConstraintKind::Prohibited);
    }

    #[test]
    fn test_providers_queried_once_per_entry() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider: Arc<dyn ConstraintProvider> = Arc::new(FnProvider::new("counting", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Constraint::prohibited().with_explanation("excluded")])
        }));

        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.4"))
            .build()
            .unwrap();
        let mut request = Request::new();
        request
            .require(Requirement::new("etcd"))
            .require(Requirement::new("etcd").channel("stable"));

        let assembly = assemble(&cache, &[provider], &request);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            variable(&assembly, "etcd/etcd.v0.9.4/0.9.4").constraints()[0].explanation(),
            Some("etcd.v0.9.4: excluded")
        );
    }

    #[test]
    fn test_provider_error_aborts() {
        let provider: Arc<dyn ConstraintProvider> = Arc::new(FnProvider::new("failing", |_| {
            Err(ProviderError::MissingClusterProperties)
        }));
        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.4"))
            .build()
            .unwrap();
        let mut request = Request::new();
        request.require(Requirement::new("etcd"));

        let policy = Policy::new();
        let ctx = ResolveContext::new();
        let err = Assembler::new(&cache, &[provider], &policy, &ctx)
            .assemble(&request)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Provider { entry, .. } if entry == "etcd.v0.9.4"));
    }

    #[test]
    fn test_installed_keeps_same_or_newer() {
        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.0"))
            .add(entry("etcd", "0.9.2"))
            .add(entry("etcd", "0.9.4"))
            .build()
            .unwrap();
        let installed = Arc::new(entry("etcd", "0.9.2"));
        let mut request = Request::new();
        request.installed(installed);

        let assembly = assemble(&cache, &[], &request);
        assert_eq!(
            variable(&assembly, "installed/etcd").constraints()[1].kind(),
            &ConstraintKind::Dependency(vec![
                Identifier::from("etcd/etcd.v0.9.4/0.9.4"),
                Identifier::from("etcd/etcd.v0.9.2/0.9.2"),
            ])
        );
    }

    #[test]
    fn test_gvk_uniqueness_across_packages() {
        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.4").with_property(Property::gvk("g", "v1", "K")))
            .add(entry("etcd-fork", "1.0.0").with_property(Property::gvk("g", "v1", "K")))
            .build()
            .unwrap();
        let mut request = Request::new();
        request
            .require(Requirement::new("etcd"))
            .require(Requirement::new("etcd-fork"));

        let assembly = assemble(&cache, &[], &request);
        assert!(assembly
            .variables
            .iter()
            .any(|v| v.id().as_str() == "unique/gvk/g/v1, Kind=K"));
        assert!(!assembly
            .variables
            .iter()
            .any(|v| v.id().as_str().starts_with("unique/package/")));
    }

    #[test]
    fn test_conflicts_against_candidates() {
        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.4").with_conflict(Property::package_required("etcd-fork", "")))
            .add(entry("etcd-fork", "1.0.0"))
            .build()
            .unwrap();
        let mut request = Request::new();
        request
            .require(Requirement::new("etcd"))
            .require(Requirement::new("etcd-fork"));

        let assembly = assemble(&cache, &[], &request);
        assert_eq!(
            variable(&assembly, "etcd/etcd.v0.9.4/0.9.4").constraints()[0].kind(),
            &ConstraintKind::Conflict(Identifier::from("etcd-fork/etcd-fork.v1.0.0/1.0.0"))
        );
    }

    #[test]
    fn test_cancelled_context() {
        let cache = Cache::builder(Scope::Global)
            .add(entry("etcd", "0.9.4"))
            .build()
            .unwrap();
        let mut request = Request::new();
        request.require(Requirement::new("etcd"));

        let policy = Policy::new();
        let ctx = ResolveContext::new();
        ctx.cancel();
        let err = Assembler::new(&cache, &[], &policy, &ctx)
            .assemble(&request)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Cancelled));
    }
}

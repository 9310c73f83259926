use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::cache::Entry;
use crate::solver::Identifier;

/// A single step of an installation plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Install a bundle of a package that is not installed yet
    Install(Arc<Entry>),
    /// Replace the installed bundle of a package
    Upgrade { from: Arc<Entry>, to: Arc<Entry> },
}

impl Step {
    /// The entry installed by this step
    pub fn entry(&self) -> &Arc<Entry> {
        match self {
            Step::Install(entry) => entry,
            Step::Upgrade { to, .. } => to,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Install(entry) => write!(f, "install {}", entry),
            Step::Upgrade { from, to } => write!(f, "upgrade {} to {}", from, to),
        }
    }
}

/// Ordered steps; a providing entry always comes before the entries that
/// depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallPlan {
    pub steps: Vec<Step>,
}

impl InstallPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the plan for the selected entries.
    ///
    /// `dependencies` holds, per entry, the candidate lists of its declared
    /// dependencies; the first selected candidate of each list is the
    /// provider that has to come first. Selected entries identical to an
    /// installed one produce no step.
    pub(crate) fn build(
        selected: Vec<Arc<Entry>>,
        dependencies: &IndexMap<Identifier, Vec<Vec<Identifier>>>,
        installed: &[Arc<Entry>],
    ) -> Self {
        let present: HashMap<&str, &Arc<Entry>> = installed
            .iter()
            .map(|e| (e.package.as_str(), e))
            .collect();

        let mut steps = Vec::new();
        for entry in selected {
            match present.get(entry.package.as_str()) {
                Some(from) if Identifier::for_entry(from) == Identifier::for_entry(&entry) => {
                    log::trace!("{} is already installed", entry);
                }
                Some(from) => steps.push(Step::Upgrade {
                    from: Arc::clone(from),
                    to: entry,
                }),
                None => steps.push(Step::Install(entry)),
            }
        }

        Self {
            steps: topological_sort_steps(steps, dependencies),
        }
    }

    /// Entries installed by the plan, in order
    pub fn entries(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.steps.iter().map(|s| s.entry())
    }

    /// Find the step for a bundle name
    pub fn find(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.entry().name == name)
    }

    /// Position of a bundle in the plan
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.entry().name == name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for InstallPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}. {}", i + 1, step)?;
        }
        Ok(())
    }
}

/// Order steps so providers come before their dependents.
///
/// Ties are broken by package and bundle name so the plan is stable for a
/// given selection.
fn topological_sort_steps(
    steps: Vec<Step>,
    dependencies: &IndexMap<Identifier, Vec<Vec<Identifier>>>,
) -> Vec<Step> {
    if steps.is_empty() {
        return steps;
    }

    let index: HashMap<Identifier, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (Identifier::for_entry(s.entry()), i))
        .collect();

    // Edge provider -> dependent: the provider unblocks the dependent
    let mut in_degree: Vec<usize> = vec![0; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];

    for (idx, step) in steps.iter().enumerate() {
        let id = Identifier::for_entry(step.entry());
        for candidates in dependencies.get(&id).into_iter().flatten() {
            let provider = candidates
                .iter()
                .filter(|c| **c != id)
                .find_map(|c| index.get(c).copied());
            if let Some(provider) = provider {
                if !dependents[provider].contains(&idx) {
                    dependents[provider].push(idx);
                    in_degree[idx] += 1;
                }
            }
        }
    }

    let key = |i: usize| {
        let entry = steps[i].entry();
        (entry.package.clone(), entry.name.clone(), i)
    };

    // Kahn's algorithm with a sorted ready set
    let mut ready: BTreeSet<(String, String, usize)> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| key(i))
        .collect();
    let mut order: Vec<usize> = Vec::with_capacity(steps.len());

    while let Some(next) = ready.pop_first() {
        let idx = next.2;
        order.push(idx);

        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(key(dependent));
            }
        }
    }

    if order.len() != steps.len() {
        log::warn!(
            "dependency cycle among {} plan steps, appending them unordered",
            steps.len() - order.len()
        );
        let mut rest: Vec<usize> = (0..steps.len()).filter(|i| !order.contains(i)).collect();
        rest.sort_by_key(|&i| key(i));
        order.extend(rest);
    }

    let mut slots: Vec<Option<Step>> = steps.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect()
}

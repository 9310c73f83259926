use super::constraint::{AppliedConstraint, Identifier, Variable};
use super::decisions::Decisions;
use super::problem::{NotSatisfiable, Problem, SolveError};
use super::rule::{Literal, RuleType, VarIndex};
use super::rule_set::RuleSet;
use super::watch_graph::{PropagateResult, Propagator, WatchGraph};
use crate::context::{Interrupted, ResolveContext};

/// Boolean satisfiability solver over constraint-carrying variables.
///
/// The search is a DPLL loop: unit propagation over a two-watched-literal
/// graph, branching only on dependencies of installed variables, and
/// chronological backtracking over the remaining alternatives. Branches
/// try dependency targets in the order they were given, so earlier targets
/// are preferred.
///
/// Once a model is found the solver tightens a bound on the number of
/// installed variables until no smaller model exists, so the answer
/// installs as few variables as possible and, among those, follows the
/// target preference order.
pub struct Solver<'a> {
    variables: &'a [Variable],
    ctx: &'a ResolveContext,
}

impl<'a> Solver<'a> {
    pub fn new(variables: &'a [Variable], ctx: &'a ResolveContext) -> Self {
        Self { variables, ctx }
    }

    /// Find the variables to install.
    ///
    /// Returns the installed identifiers in decision order, or a minimal
    /// set of unsatisfiable constraints.
    pub fn solve(&self) -> Result<Vec<Identifier>, SolveError> {
        let problem = Problem::compile(self.variables)?;
        let enabled = vec![true; problem.applied().len()];

        let Some(mut best) = self.search(&problem, &enabled, None)? else {
            log::debug!("no solution found, minimizing {} constraints", problem.applied().len());
            let core = self.minimize(&problem)?;
            return Err(SolveError::NotSatisfiable(NotSatisfiable::new(core)));
        };

        while !best.is_empty() {
            match self.search(&problem, &enabled, Some(best.len() - 1))? {
                Some(smaller) => {
                    log::trace!("found a model installing {} variables", smaller.len());
                    best = smaller;
                }
                None => break,
            }
        }

        log::debug!(
            "solved {} variables with {} constraints, installing {}",
            problem.variable_count(),
            problem.applied().len(),
            best.len()
        );

        Ok(best
            .into_iter()
            .map(|var| problem.identifier(var).clone())
            .collect())
    }

    /// Deletion-based minimization: a constraint stays in the result only
    /// if the remaining set becomes satisfiable without it.
    fn minimize(&self, problem: &Problem<'_>) -> Result<Vec<AppliedConstraint>, Interrupted> {
        let mut enabled = vec![true; problem.applied().len()];

        for i in 0..enabled.len() {
            enabled[i] = false;
            if self.search(problem, &enabled, None)?.is_some() {
                enabled[i] = true;
            }
        }

        Ok(problem
            .applied()
            .iter()
            .zip(&enabled)
            .filter(|(_, on)| **on)
            .map(|(constraint, _)| constraint.clone())
            .collect())
    }

    /// Run one search over the enabled constraints.
    ///
    /// With a bound, any partial assignment installing more than `bound`
    /// variables counts as a conflict.
    fn search(
        &self,
        problem: &Problem<'_>,
        enabled: &[bool],
        bound: Option<usize>,
    ) -> Result<Option<Vec<VarIndex>>, Interrupted> {
        let mut state = SearchState::new(problem.rules(enabled), problem.variable_count());

        if !self.process_assertions(&mut state) {
            return Ok(None);
        }

        loop {
            self.ctx.check()?;

            let consistent = self.propagate(&mut state).is_ok()
                && bound.map_or(true, |b| state.decisions.installed_count() <= b);

            if !consistent {
                if !self.backtrack(&mut state) {
                    return Ok(None);
                }
                continue;
            }

            let Some((first, alternatives)) = self.select_next(&state) else {
                return Ok(Some(state.decisions.installed().collect()));
            };

            state.decisions.increment_level();
            let level = state.decisions.level();
            state.decisions.decide(first, None);
            if !alternatives.is_empty() {
                state.branches.push(Branch {
                    level,
                    alternatives,
                });
            }
        }
    }

    /// Decide every single-literal rule at level 1.
    ///
    /// Returns false when two assertions contradict each other.
    fn process_assertions(&self, state: &mut SearchState) -> bool {
        state.decisions.increment_level();

        for rule in state.rules.assertions() {
            let literal = rule.literals()[0];
            if state.decisions.conflict(literal) {
                log::trace!("conflicting assertion {}", rule);
                return false;
            }
            state.decisions.decide(literal, Some(rule.id()));
        }

        true
    }

    /// Propagate consequences of new decisions, returning the conflicting rule on failure
    fn propagate(&self, state: &mut SearchState) -> Result<(), u32> {
        while let Some(literal) = state.decisions.literal_at(state.propagate_index) {
            state.propagate_index += 1;

            let results = {
                let decisions = &state.decisions;
                let mut propagator = Propagator::new(&mut state.watch_graph, &state.rules);
                propagator.propagate(literal, |l| decisions.value(l))
            };

            for result in results {
                match result {
                    PropagateResult::Unit(unit, rule_id) => {
                        if !state.decisions.decide(unit, Some(rule_id)) {
                            return Err(rule_id);
                        }
                    }
                    PropagateResult::Conflict(rule_id) => return Err(rule_id),
                }
            }
        }

        Ok(())
    }

    /// Undo decisions up to the most recent branch that still has an alternative
    fn backtrack(&self, state: &mut SearchState) -> bool {
        while let Some(branch) = state.branches.last_mut() {
            let level = branch.level;
            if branch.alternatives.is_empty() {
                state.branches.pop();
                continue;
            }
            let alternative = branch.alternatives.remove(0);

            state.decisions.revert_to_level(level - 1);
            state.decisions.increment_level();
            state.propagate_index = state.decisions.len();

            if state.decisions.conflict(alternative) {
                continue;
            }
            state.decisions.decide(alternative, None);
            return true;
        }

        false
    }

    /// Pick the first unsatisfied dependency of an installed variable,
    /// returning its preferred undecided target and the remaining ones.
    fn select_next(&self, state: &SearchState) -> Option<(Literal, Vec<Literal>)> {
        for rule in state.rules.iter() {
            if rule.rule_type() != RuleType::Dependency || rule.len() < 2 {
                continue;
            }

            let literals = rule.literals();
            if !state.decisions.decided_install(-literals[0]) {
                continue;
            }

            let targets = &literals[1..];
            if targets.iter().any(|&t| state.decisions.satisfied(t)) {
                continue;
            }

            let mut candidates = targets
                .iter()
                .copied()
                .filter(|&t| !state.decisions.conflict(t));
            if let Some(first) = candidates.next() {
                return Some((first, candidates.collect()));
            }
        }

        None
    }
}

struct SearchState {
    rules: RuleSet,
    decisions: Decisions,
    watch_graph: WatchGraph,
    /// Branch points for backtracking, innermost last
    branches: Vec<Branch>,
    /// Index of next decision to propagate
    propagate_index: usize,
}

impl SearchState {
    fn new(rules: RuleSet, variable_count: usize) -> Self {
        let watch_graph = WatchGraph::from_rules(&rules);
        Self {
            rules,
            decisions: Decisions::new(variable_count),
            watch_graph,
            branches: Vec::new(),
            propagate_index: 0,
        }
    }
}

/// A branch point for backtracking
struct Branch {
    /// Decision level of the branch
    level: u32,
    /// Targets not tried yet, in preference order
    alternatives: Vec<Literal>,
}

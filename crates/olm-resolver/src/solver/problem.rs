use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::constraint::{AppliedConstraint, ConstraintKind, Identifier, Variable};
use super::rule::{Rule, RuleType, VarIndex};
use super::rule_set::RuleSet;
use crate::context::Interrupted;

/// Errors produced by the solver
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("constraints not satisfiable: {0}")]
    NotSatisfiable(NotSatisfiable),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error("duplicate variable identifier {0}")]
    DuplicateIdentifier(Identifier),

    #[error("constraint on {subject} references unknown variable {target}")]
    UnknownIdentifier { subject: Identifier, target: Identifier },
}

/// A set of applied constraints that cannot be satisfied together.
///
/// The set is minimal: dropping any one of its constraints makes the
/// remainder satisfiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotSatisfiable {
    constraints: Vec<AppliedConstraint>,
}

impl NotSatisfiable {
    pub fn new(constraints: Vec<AppliedConstraint>) -> Self {
        Self { constraints }
    }

    pub fn constraints(&self) -> &[AppliedConstraint] {
        &self.constraints
    }

    /// Rendered explanation of every constraint in the set
    pub fn explanations(&self) -> Vec<String> {
        self.constraints.iter().map(|c| c.to_string()).collect()
    }
}

impl fmt::Display for NotSatisfiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraints.is_empty() {
            return f.write_str("no solution found");
        }
        f.write_str(&self.explanations().join(", "))
    }
}

/// Variables and constraints compiled into rules.
///
/// Every applied constraint yields at most one rule; constraints that can
/// never be violated (e.g. a dependency on the subject itself) yield none.
#[derive(Debug)]
pub(crate) struct Problem<'a> {
    variables: &'a [Variable],
    applied: Vec<AppliedConstraint>,
    rules: Vec<Option<Rule>>,
}

impl<'a> Problem<'a> {
    pub fn compile(variables: &'a [Variable]) -> Result<Self, SolveError> {
        let mut index: HashMap<&Identifier, VarIndex> = HashMap::with_capacity(variables.len());
        for (i, variable) in variables.iter().enumerate() {
            if index.insert(variable.id(), i as VarIndex + 1).is_some() {
                return Err(SolveError::DuplicateIdentifier(variable.id().clone()));
            }
        }

        let lookup = |subject: &Identifier, target: &Identifier| {
            index
                .get(target)
                .copied()
                .ok_or_else(|| SolveError::UnknownIdentifier {
                    subject: subject.clone(),
                    target: target.clone(),
                })
        };

        let mut applied = Vec::new();
        let mut rules = Vec::new();

        for (i, variable) in variables.iter().enumerate() {
            let subject = i as VarIndex + 1;
            for constraint in variable.constraints() {
                let origin = applied.len();
                let rule = match constraint.kind() {
                    ConstraintKind::Mandatory => {
                        Some(Rule::assertion(subject, RuleType::Mandatory, origin))
                    }
                    ConstraintKind::Prohibited => {
                        Some(Rule::assertion(-subject, RuleType::Prohibited, origin))
                    }
                    ConstraintKind::Dependency(targets) => {
                        let mut resolved: Vec<VarIndex> = Vec::with_capacity(targets.len());
                        for target in targets {
                            let t = lookup(variable.id(), target)?;
                            if !resolved.contains(&t) {
                                resolved.push(t);
                            }
                        }
                        if resolved.contains(&subject) {
                            None
                        } else if resolved.is_empty() {
                            Some(Rule::new(vec![-subject], RuleType::Dependency, origin))
                        } else {
                            Some(Rule::dependency(subject, resolved, origin))
                        }
                    }
                    ConstraintKind::Conflict(other) => {
                        let other = lookup(variable.id(), other)?;
                        if other == subject {
                            Some(Rule::new(vec![-subject], RuleType::Conflict, origin))
                        } else {
                            Some(Rule::conflict(subject, other, origin))
                        }
                    }
                    ConstraintKind::AtMostOne(members) => {
                        let mut resolved: Vec<VarIndex> = Vec::with_capacity(members.len());
                        for member in members {
                            let m = lookup(variable.id(), member)?;
                            if !resolved.contains(&m) {
                                resolved.push(m);
                            }
                        }
                        if resolved.len() < 2 {
                            None
                        } else {
                            Some(Rule::at_most_one(resolved, origin))
                        }
                    }
                };

                applied.push(AppliedConstraint {
                    variable: variable.id().clone(),
                    constraint: constraint.clone(),
                });
                rules.push(rule);
            }
        }

        Ok(Self {
            variables,
            applied,
            rules,
        })
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn identifier(&self, var: VarIndex) -> &Identifier {
        self.variables[(var - 1) as usize].id()
    }

    pub fn applied(&self) -> &[AppliedConstraint] {
        &self.applied
    }

    /// Build the rule set of the enabled constraints
    pub fn rules(&self, enabled: &[bool]) -> RuleSet {
        let mut set = RuleSet::new();
        for (rule, &on) in self.rules.iter().zip(enabled) {
            if let (Some(rule), true) = (rule, on) {
                set.add(rule.clone());
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::constraint::Constraint;

    #[test]
    fn test_compile_rules() {
        let variables = vec![
            Variable::new("a".into())
                .with_constraint(Constraint::mandatory())
                .with_constraint(Constraint::dependency(vec!["b".into(), "c".into()])),
            Variable::new("b".into()).with_constraint(Constraint::conflict("c".into())),
            Variable::new("c".into()).with_constraint(Constraint::prohibited()),
        ];

        let problem = Problem::compile(&variables).unwrap();
        let rules = problem.rules(&[true; 4]);
        let literals: Vec<Vec<i32>> = rules.iter().map(|r| r.literals().to_vec()).collect();

        assert_eq!(literals, vec![vec![1], vec![-1, 2, 3], vec![-2, -3], vec![-3]]);
        assert_eq!(problem.applied().len(), 4);
        assert_eq!(problem.identifier(2).as_str(), "b");
    }

    #[test]
    fn test_disabled_constraints_are_skipped() {
        let variables = vec![Variable::new("a".into())
            .with_constraint(Constraint::mandatory())
            .with_constraint(Constraint::prohibited())];

        let problem = Problem::compile(&variables).unwrap();
        assert_eq!(problem.rules(&[false, true]).len(), 1);
    }

    #[test]
    fn test_trivial_constraints_compile_to_nothing() {
        let variables = vec![
            Variable::new("a".into())
                .with_constraint(Constraint::dependency(vec!["a".into(), "b".into()])),
            Variable::new("b".into()).with_constraint(Constraint::at_most_one(vec!["a".into()])),
        ];

        let problem = Problem::compile(&variables).unwrap();
        assert!(problem.rules(&[true, true]).is_empty());
        assert_eq!(problem.applied().len(), 2);
    }

    #[test]
    fn test_duplicate_and_unknown_identifiers() {
        let variables = vec![Variable::new("a".into()), Variable::new("a".into())];
        assert!(matches!(
            Problem::compile(&variables),
            Err(SolveError::DuplicateIdentifier(id)) if id.as_str() == "a"
        ));

        let variables =
            vec![Variable::new("a".into()).with_constraint(Constraint::conflict("x".into()))];
        assert!(matches!(
            Problem::compile(&variables),
            Err(SolveError::UnknownIdentifier { target, .. }) if target.as_str() == "x"
        ));
    }
}

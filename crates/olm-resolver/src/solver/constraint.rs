//! Solver-facing constraint model: identifiers, constraints and variables

use std::fmt;

use crate::cache::Entry;

/// Identifier of a solver variable.
///
/// Entry variables use [`Identifier::for_entry`]; synthetic variables
/// (requests, installed packages, uniqueness groups) use descriptive names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of a cache entry, unique per (package, bundle, version)
    pub fn for_entry(entry: &Entry) -> Self {
        Self(format!("{}/{}/{}", entry.package, entry.name, entry.version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a constraint requires of its subject variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// The subject must be installed
    Mandatory,
    /// The subject must not be installed
    Prohibited,
    /// If the subject is installed, at least one target must be.
    /// Targets are in preference order. No targets makes the subject uninstallable.
    Dependency(Vec<Identifier>),
    /// The subject and the other variable cannot both be installed
    Conflict(Identifier),
    /// At most one of the members can be installed, regardless of the subject
    AtMostOne(Vec<Identifier>),
}

/// A constraint with the explanation rendered when it takes part in a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    kind: ConstraintKind,
    explanation: Option<String>,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            explanation: None,
        }
    }

    pub fn mandatory() -> Self {
        Self::new(ConstraintKind::Mandatory)
    }

    pub fn prohibited() -> Self {
        Self::new(ConstraintKind::Prohibited)
    }

    pub fn dependency(targets: Vec<Identifier>) -> Self {
        Self::new(ConstraintKind::Dependency(targets))
    }

    pub fn conflict(other: Identifier) -> Self {
        Self::new(ConstraintKind::Conflict(other))
    }

    pub fn at_most_one(members: Vec<Identifier>) -> Self {
        Self::new(ConstraintKind::AtMostOne(members))
    }

    /// Replace the default explanation
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Render the constraint as applied to `subject`
    pub fn describe(&self, subject: &Identifier) -> String {
        if let Some(explanation) = &self.explanation {
            return explanation.clone();
        }

        match &self.kind {
            ConstraintKind::Mandatory => format!("{} is mandatory", subject),
            ConstraintKind::Prohibited => format!("{} is prohibited", subject),
            ConstraintKind::Dependency(targets) if targets.is_empty() => format!(
                "{} has a dependency without any candidates to satisfy it",
                subject
            ),
            ConstraintKind::Dependency(targets) => format!(
                "{} requires at least one of {}",
                subject,
                join(targets)
            ),
            ConstraintKind::Conflict(other) => format!("{} conflicts with {}", subject, other),
            ConstraintKind::AtMostOne(members) => {
                format!("{} permits at most 1 of {}", subject, join(members))
            }
        }
    }
}

pub(crate) fn join(ids: &[Identifier]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A constraint together with the variable it was applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedConstraint {
    pub variable: Identifier,
    pub constraint: Constraint,
}

impl fmt::Display for AppliedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.constraint.describe(&self.variable))
    }
}

/// A solver variable: an identifier and the constraints applied to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    id: Identifier,
    constraints: Vec<Constraint>,
}

impl Variable {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn extend(&mut self, constraints: impl IntoIterator<Item = Constraint>) {
        self.constraints.extend(constraints);
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptions() {
        let a = Identifier::from("a");
        let b = Identifier::from("b");

        assert_eq!(Constraint::mandatory().describe(&a), "a is mandatory");
        assert_eq!(Constraint::prohibited().describe(&a), "a is prohibited");
        assert_eq!(
            Constraint::dependency(vec![b.clone(), "c".into()]).describe(&a),
            "a requires at least one of b, c"
        );
        assert_eq!(
            Constraint::dependency(vec![]).describe(&a),
            "a has a dependency without any candidates to satisfy it"
        );
        assert_eq!(Constraint::conflict(b.clone()).describe(&a), "a conflicts with b");
        assert_eq!(
            Constraint::at_most_one(vec![b, "c".into()]).describe(&a),
            "a permits at most 1 of b, c"
        );
    }

    #[test]
    fn test_explanation_overrides_default() {
        let applied = AppliedConstraint {
            variable: "anakin".into(),
            constraint: Constraint::prohibited().with_explanation("excluded"),
        };
        assert_eq!(applied.to_string(), "excluded");
    }
}

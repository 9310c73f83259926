use std::fmt;
use std::hash::{Hash, Hasher};

/// A literal in SAT terms - positive means "install", negative means "don't install"
pub type Literal = i32;

/// Index of a variable inside a compiled problem (1-based so it can be negated)
pub type VarIndex = i32;

/// The kind of constraint a rule was compiled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Variable must be installed
    Mandatory,
    /// Variable must not be installed
    Prohibited,
    /// If the subject is installed, one of the targets must be
    Dependency,
    /// Two variables cannot both be installed
    Conflict,
    /// At most one of the literals' variables can be installed.
    /// Watches every literal instead of two.
    AtMostOne,
}

/// A SAT rule (clause) compiled from one applied constraint.
///
/// Rules are disjunctions (OR) of literals. A rule is satisfied when
/// at least one of its literals is true, except [`RuleType::AtMostOne`]
/// rules whose negative literals may have at most one false member.
///
/// # Examples
///
/// - `[A]` - A must be installed
/// - `[-A]` - A must not be installed
/// - `[-A, B, C]` - if A is installed, then B or C must be installed
/// - `[-A, -B]` - A and B cannot both be installed
#[derive(Clone)]
pub struct Rule {
    literals: Vec<Literal>,
    rule_type: RuleType,
    /// Rule ID (assigned by RuleSet)
    id: u32,
    /// Index of the applied constraint this rule came from
    origin: usize,
}

impl Rule {
    pub fn new(literals: Vec<Literal>, rule_type: RuleType, origin: usize) -> Self {
        Self {
            literals,
            rule_type,
            id: 0,
            origin,
        }
    }

    /// Create an assertion rule (single literal that must be true)
    pub fn assertion(literal: Literal, rule_type: RuleType, origin: usize) -> Self {
        Self::new(vec![literal], rule_type, origin)
    }

    /// Create a dependency rule: if subject is installed, one of targets must be
    pub fn dependency(subject: VarIndex, targets: Vec<VarIndex>, origin: usize) -> Self {
        let mut literals = vec![-subject];
        literals.extend(targets);
        Self::new(literals, RuleType::Dependency, origin)
    }

    /// Create a conflict rule: both variables cannot be installed together
    pub fn conflict(a: VarIndex, b: VarIndex, origin: usize) -> Self {
        Self::new(vec![-a, -b], RuleType::Conflict, origin)
    }

    /// Create an at-most-one rule over the given variables
    pub fn at_most_one(members: Vec<VarIndex>, origin: usize) -> Self {
        let literals = members.into_iter().map(|m| -m).collect();
        Self::new(literals, RuleType::AtMostOne, origin)
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Check if this is an assertion (single literal)
    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn is_at_most_one(&self) -> bool {
        self.rule_type == RuleType::AtMostOne
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Get a hash of this rule's literals for deduplication
    pub fn literal_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();

        let mut sorted = self.literals.clone();
        sorted.sort();
        sorted.hash(&mut hasher);
        self.is_at_most_one().hash(&mut hasher);

        hasher.finish()
    }

    /// Check if two rules have the same semantics (literals regardless of order)
    pub fn equals_literals(&self, other: &Rule) -> bool {
        if self.literals.len() != other.literals.len()
            || self.is_at_most_one() != other.is_at_most_one()
        {
            return false;
        }

        let mut a = self.literals.clone();
        let mut b = other.literals.clone();
        a.sort();
        b.sort();
        a == b
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({:?}, {:?})", self.rule_type, self.literals)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|&l| if l > 0 { format!("+{}", l) } else { format!("{}", l) })
            .collect();

        let kind = match self.rule_type {
            RuleType::Mandatory => "mandatory",
            RuleType::Prohibited => "prohibited",
            RuleType::Dependency => "dependency",
            RuleType::Conflict => "conflict",
            RuleType::AtMostOne => "at-most-one",
        };
        write!(f, "({}) [{}]", kind, literals.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_assertion() {
        let rule = Rule::assertion(5, RuleType::Mandatory, 0);
        assert!(rule.is_assertion());
        assert_eq!(rule.literals(), &[5]);
    }

    #[test]
    fn test_rule_dependency() {
        let rule = Rule::dependency(1, vec![2, 3, 4], 7);
        assert_eq!(rule.literals(), &[-1, 2, 3, 4]);
        assert_eq!(rule.rule_type(), RuleType::Dependency);
        assert_eq!(rule.origin(), 7);
    }

    #[test]
    fn test_rule_conflict_and_at_most_one() {
        assert_eq!(Rule::conflict(1, 2, 0).literals(), &[-1, -2]);
        let rule = Rule::at_most_one(vec![1, 2, 3], 0);
        assert_eq!(rule.literals(), &[-1, -2, -3]);
        assert!(rule.is_at_most_one());
    }

    #[test]
    fn test_rule_equals_literals() {
        let a = Rule::new(vec![-1, -2], RuleType::Conflict, 0);
        let b = Rule::new(vec![-2, -1], RuleType::Conflict, 3);
        let c = Rule::at_most_one(vec![1, 2], 0);

        assert!(a.equals_literals(&b));
        assert_eq!(a.literal_hash(), b.literal_hash());
        // Same literals, but at-most-one propagates differently once it has more members
        assert!(!a.equals_literals(&c));
    }

    #[test]
    fn test_rule_display() {
        let rule = Rule::dependency(1, vec![2, 3], 0);
        assert_eq!(format!("{}", rule), "(dependency) [-1 | +2 | +3]");
    }
}

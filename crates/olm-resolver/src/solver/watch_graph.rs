use super::rule::{Literal, Rule};
use super::rule_set::RuleSet;

/// Two-watched literals graph for unit propagation.
///
/// Each non-assertion rule watches two of its literals. When a watched
/// literal becomes false, another non-false literal takes over the watch;
/// if none is left the rule is either unit or conflicting. The current
/// pair is stored per rule, so a moved watch never leaves stale partners
/// behind. At-most-one rules watch every literal.
#[derive(Debug, Default)]
pub struct WatchGraph {
    /// Maps literal index -> rule ids watching that literal
    watches: Vec<Vec<u32>>,
    /// Currently watched pair per rule id (`None` for assertions and at-most-one rules)
    watched: Vec<Option<[Literal; 2]>>,
}

impl WatchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert literal to index (handles positive and negative literals)
    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn watches_mut(&mut self, literal: Literal) -> &mut Vec<u32> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    /// Build the watch graph from a rule set
    pub fn from_rules(rules: &RuleSet) -> Self {
        let mut graph = Self::new();
        for rule in rules.iter() {
            graph.add_rule(rule);
        }
        graph
    }

    pub fn add_rule(&mut self, rule: &Rule) {
        let literals = rule.literals();
        if literals.len() < 2 {
            return;
        }

        let rule_id = rule.id();
        if self.watched.len() <= rule_id as usize {
            self.watched.resize(rule_id as usize + 1, None);
        }

        if rule.is_at_most_one() {
            for &literal in literals {
                self.watches_mut(literal).push(rule_id);
            }
            return;
        }

        self.watched[rule_id as usize] = Some([literals[0], literals[1]]);
        self.watches_mut(literals[0]).push(rule_id);
        self.watches_mut(literals[1]).push(rule_id);
    }

    /// Rules watching a literal
    pub fn watches(&self, literal: Literal) -> &[u32] {
        self.watches
            .get(Self::literal_to_index(literal))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The literal watched alongside `literal` in a two-watched rule
    pub fn other_watch(&self, rule_id: u32, literal: Literal) -> Option<Literal> {
        let [a, b] = self.watched.get(rule_id as usize).copied().flatten()?;
        if a == literal {
            Some(b)
        } else if b == literal {
            Some(a)
        } else {
            None
        }
    }

    /// Move a rule's watch from one literal to another
    pub fn move_watch(&mut self, rule_id: u32, from: Literal, to: Literal) {
        let from_watches = self.watches_mut(from);
        if let Some(pos) = from_watches.iter().position(|&id| id == rule_id) {
            from_watches.swap_remove(pos);
        }
        self.watches_mut(to).push(rule_id);

        if let Some(Some(pair)) = self.watched.get_mut(rule_id as usize) {
            for watched in pair.iter_mut() {
                if *watched == from {
                    *watched = to;
                    break;
                }
            }
        }
    }
}

/// Result of propagating one decided literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagateResult {
    /// A literal was forced by the given rule
    Unit(Literal, u32),
    /// The given rule can no longer be satisfied
    Conflict(u32),
}

/// Performs unit propagation over the watch graph
pub struct Propagator<'a> {
    graph: &'a mut WatchGraph,
    rules: &'a RuleSet,
}

impl<'a> Propagator<'a> {
    pub fn new(graph: &'a mut WatchGraph, rules: &'a RuleSet) -> Self {
        Self { graph, rules }
    }

    /// Propagate the consequences of `literal` having been decided true.
    ///
    /// `value` reports the current state of a literal: `Some(true)` when
    /// satisfied, `Some(false)` when false, `None` when undecided.
    /// Stops at the first conflict.
    pub fn propagate<F>(&mut self, literal: Literal, value: F) -> Vec<PropagateResult>
    where
        F: Fn(Literal) -> Option<bool>,
    {
        let false_literal = -literal;
        let watching: Vec<u32> = self.graph.watches(false_literal).to_vec();
        let mut results = Vec::new();

        for rule_id in watching {
            let Some(rule) = self.rules.get(rule_id) else {
                continue;
            };

            if rule.is_at_most_one() {
                // One member is installed, every other member must stay out
                for &other in rule.literals() {
                    if other == false_literal {
                        continue;
                    }
                    match value(other) {
                        Some(true) => {}
                        Some(false) => {
                            results.push(PropagateResult::Conflict(rule_id));
                            return results;
                        }
                        None => results.push(PropagateResult::Unit(other, rule_id)),
                    }
                }
                continue;
            }

            let Some(other) = self.graph.other_watch(rule_id, false_literal) else {
                continue;
            };
            if value(other) == Some(true) {
                continue;
            }

            let replacement = rule
                .literals()
                .iter()
                .copied()
                .find(|&l| l != false_literal && l != other && value(l) != Some(false));
            if let Some(replacement) = replacement {
                self.graph.move_watch(rule_id, false_literal, replacement);
                continue;
            }

            match value(other) {
                None => results.push(PropagateResult::Unit(other, rule_id)),
                Some(false) => {
                    results.push(PropagateResult::Conflict(rule_id));
                    return results;
                }
                Some(true) => {}
            }
        }

        results
    }
}

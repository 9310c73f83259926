use std::collections::HashMap;

use super::rule::Rule;

/// Collection of SAT rules for one search.
///
/// Rules with identical literals are stored once; the first rule added
/// wins, so its origin is the one reported in explanations.
#[derive(Debug, Default)]
pub struct RuleSet {
    /// All rules indexed by ID
    rules: Vec<Rule>,

    /// Hash map for deduplication
    rule_hashes: HashMap<u64, Vec<u32>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule to the set, returning its ID.
    /// Returns existing rule's ID if a duplicate exists.
    pub fn add(&mut self, mut rule: Rule) -> u32 {
        let hash = rule.literal_hash();
        if let Some(ids) = self.rule_hashes.get(&hash) {
            // Guard against hash collisions
            for &existing_id in ids {
                if let Some(existing) = self.get(existing_id) {
                    if existing.equals_literals(&rule) {
                        return existing_id;
                    }
                }
            }
        }

        let id = self.rules.len() as u32;
        rule.set_id(id);
        self.rule_hashes.entry(hash).or_default().push(id);
        self.rules.push(rule);

        id
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Get assertion rules (single literal rules)
    pub fn assertions(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_assertion())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

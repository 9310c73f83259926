use super::rule::{Literal, VarIndex};

/// Tracks decisions made during the search.
///
/// Uses a flat Vec indexed by variable for O(1) lookups.
/// The decision_map stores: 0 = undecided, >0 = installed at level N, <0 = not installed at level -N
/// (levels are stored off by one so level 0 stays distinguishable from undecided).
#[derive(Debug)]
pub struct Decisions {
    decision_map: Vec<i32>,

    /// Decisions in the order they were made [(literal, rule_id)]
    decision_queue: Vec<(Literal, Option<u32>)>,

    level: u32,

    /// Number of variables currently decided as installed
    installed: usize,
}

impl Decisions {
    /// Create a tracker for variables `1..=variable_count`
    pub fn new(variable_count: usize) -> Self {
        Self {
            decision_map: vec![0; variable_count + 1],
            decision_queue: Vec::with_capacity(variable_count),
            level: 0,
            installed: 0,
        }
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Make a decision at the current level
    ///
    /// Returns false if this conflicts with an existing decision
    pub fn decide(&mut self, literal: Literal, rule_id: Option<u32>) -> bool {
        let id = literal.unsigned_abs() as usize;
        if id >= self.decision_map.len() {
            self.decision_map.resize(id + 1, 0);
        }

        let existing = self.decision_map[id];
        if existing != 0 {
            return (existing > 0) == (literal > 0);
        }

        let level_value = (self.level + 1) as i32;
        self.decision_map[id] = if literal > 0 { level_value } else { -level_value };
        self.decision_queue.push((literal, rule_id));
        if literal > 0 {
            self.installed += 1;
        }

        true
    }

    /// Check if a literal is satisfied by current decisions
    #[inline]
    pub fn satisfied(&self, literal: Literal) -> bool {
        match self.decision_map.get(literal.unsigned_abs() as usize) {
            Some(&decision) if decision != 0 => (decision > 0) == (literal > 0),
            _ => false,
        }
    }

    /// Check if a literal conflicts with current decisions
    #[inline]
    pub fn conflict(&self, literal: Literal) -> bool {
        match self.decision_map.get(literal.unsigned_abs() as usize) {
            Some(&decision) if decision != 0 => (decision > 0) != (literal > 0),
            _ => false,
        }
    }

    /// Tri-state view of a literal: `Some(true)` satisfied, `Some(false)` conflicting, `None` undecided
    #[inline]
    pub fn value(&self, literal: Literal) -> Option<bool> {
        if self.satisfied(literal) {
            Some(true)
        } else if self.conflict(literal) {
            Some(false)
        } else {
            None
        }
    }

    #[inline]
    pub fn decided_install(&self, var: VarIndex) -> bool {
        matches!(self.decision_map.get(var as usize), Some(&d) if d > 0)
    }

    /// Revert all decisions at levels > target_level
    pub fn revert_to_level(&mut self, target_level: u32) {
        let target = (target_level + 1) as i32;

        for decision in &mut self.decision_map {
            if *decision != 0 && decision.abs() > target {
                *decision = 0;
            }
        }

        let decision_map = &self.decision_map;
        self.decision_queue
            .retain(|(literal, _)| decision_map[literal.unsigned_abs() as usize] != 0);

        self.installed = self.decision_map.iter().filter(|&&d| d > 0).count();
        self.level = target_level;
    }

    /// Literal decided at a queue position
    pub fn literal_at(&self, index: usize) -> Option<Literal> {
        self.decision_queue.get(index).map(|&(literal, _)| literal)
    }

    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decision_queue.is_empty()
    }

    pub fn installed_count(&self) -> usize {
        self.installed
    }

    /// Variables decided as installed, in decision order
    pub fn installed(&self) -> impl Iterator<Item = VarIndex> + '_ {
        self.decision_queue
            .iter()
            .filter(|(literal, _)| *literal > 0)
            .map(|&(literal, _)| literal)
    }
}

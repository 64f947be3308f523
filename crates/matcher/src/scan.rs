//! Re-scan matcher — tests every condition against the latest snapshot.
//!
//! Matching cost is linear in the number of productions. The agenda is
//! cached and only recomputed after the fact or the production set changes,
//! so idle cycles over an unchanged fact are cheap.

use deliberate_core::{Condition, Fact, ProductionId, RuleMatcher};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

pub struct ScanMatcher {
    snapshot: Fact,
    conditions: BTreeMap<ProductionId, Arc<dyn Condition>>,
    agenda: Option<Vec<ProductionId>>,
    updates: u64,
}

impl ScanMatcher {
    pub fn new() -> Self {
        Self {
            snapshot: Fact::new(),
            conditions: BTreeMap::new(),
            agenda: None,
            updates: 0,
        }
    }

    /// Number of `update_fact` calls received.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// The last fact snapshot this matcher was told about.
    pub fn snapshot(&self) -> &Fact {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    fn rescan(&self) -> Vec<ProductionId> {
        self.conditions
            .iter()
            .filter(|(_, cond)| cond.matches(&self.snapshot))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Default for ScanMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleMatcher for ScanMatcher {
    fn name(&self) -> &str {
        "scan"
    }

    fn add_fact(&mut self, fact: &Fact) {
        self.snapshot = fact.clone();
        self.agenda = None;
    }

    fn update_fact(&mut self, fact: &Fact) {
        self.snapshot = fact.clone();
        self.agenda = None;
        self.updates += 1;
    }

    fn add_production(&mut self, id: ProductionId, condition: Arc<dyn Condition>) {
        self.conditions.insert(id, condition);
        self.agenda = None;
    }

    fn remove_production(&mut self, id: ProductionId) -> bool {
        let removed = self.conditions.remove(&id).is_some();
        if removed {
            self.agenda = None;
        }
        removed
    }

    fn run_step(&mut self) -> Vec<ProductionId> {
        if self.agenda.is_none() {
            let agenda = self.rescan();
            trace!(matched = agenda.len(), total = self.conditions.len(), "Rescanned conditions");
            self.agenda = Some(agenda);
        }
        self.agenda.clone().unwrap_or_default()
    }
}

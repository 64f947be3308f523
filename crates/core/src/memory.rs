//! Working memory — the fact store plus its link to the rule matcher.
//!
//! Every mutation goes through here so the matcher is told about it before
//! the call returns. Reading is free; writing always costs exactly one
//! `update_fact` notification.

use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use crate::error::FactError;
use crate::fact::{Fact, FactKey};
use crate::matcher::RuleMatcher;
use crate::production::{Condition, ProductionId};

pub struct WorkingMemory {
    fact: Fact,
    matcher: Box<dyn RuleMatcher>,
    notifications: u64,
}

impl WorkingMemory {
    /// Create an empty fact and announce it to `matcher`.
    pub fn new(mut matcher: Box<dyn RuleMatcher>) -> Self {
        let fact = Fact::new();
        matcher.add_fact(&fact);
        Self {
            fact,
            matcher,
            notifications: 0,
        }
    }

    /// Read-only view of the fact.
    pub fn fact(&self) -> &Fact {
        &self.fact
    }

    pub fn get(&self, key: &FactKey) -> Option<&Value> {
        self.fact.get(key)
    }

    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.fact.get_named(name)
    }

    /// Assign `value` under `key`, or under a fresh positional index when
    /// `key` is `None`. Returns the key used.
    pub fn set(&mut self, key: Option<FactKey>, value: impl Into<Value>) -> FactKey {
        let key = key.unwrap_or_else(|| FactKey::Index(self.fact.next_index()));
        self.fact.insert(key.clone(), value.into());
        trace!(key = %key, "fact attribute set");
        self.notify();
        key
    }

    /// Assign under an explicit key.
    pub fn assign(&mut self, key: impl Into<FactKey>, value: impl Into<Value>) {
        self.set(Some(key.into()), value);
    }

    /// Append under a fresh positional index.
    pub fn push(&mut self, value: impl Into<Value>) -> FactKey {
        self.set(None, value)
    }

    /// Remove an attribute. An absent key is an error and notifies nobody.
    pub fn unset(&mut self, key: &FactKey) -> Result<Value, FactError> {
        let value = self
            .fact
            .remove(key)
            .ok_or_else(|| FactError::NotFound(key.clone()))?;
        trace!(key = %key, "fact attribute removed");
        self.notify();
        Ok(value)
    }

    /// Number of `update_fact` notifications sent so far.
    pub fn notifications(&self) -> u64 {
        self.notifications
    }

    pub fn matcher_name(&self) -> &str {
        self.matcher.name()
    }

    pub fn register_condition(&mut self, id: ProductionId, condition: Arc<dyn Condition>) {
        self.matcher.add_production(id, condition);
    }

    pub fn unregister_condition(&mut self, id: ProductionId) -> bool {
        self.matcher.remove_production(id)
    }

    /// Ask the matcher for the current conflict set.
    pub fn conflict_set(&mut self) -> Vec<ProductionId> {
        self.matcher.run_step()
    }

    fn notify(&mut self) {
        self.matcher.update_fact(&self.fact);
        self.notifications += 1;
    }
}

impl std::fmt::Debug for WorkingMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingMemory")
            .field("fact", &self.fact)
            .field("matcher", &self.matcher.name())
            .field("notifications", &self.notifications)
            .finish()
    }
}

//! RuleMatcher trait — the abstraction over the pattern-matching network.
//!
//! The coordination layer never tests conditions itself. It pushes fact
//! snapshots and production conditions into a matcher and asks it, once per
//! deliberation step, which productions currently match. Any conforming
//! implementation works: a naive re-scan, an attribute index, or an
//! incremental RETE-style network.

use std::sync::Arc;

use crate::fact::Fact;
use crate::production::{Condition, ProductionId};

pub trait RuleMatcher: Send {
    /// Short identifier used in logs (e.g. "scan").
    fn name(&self) -> &str;

    /// Announce the working-memory fact. Called once, at construction.
    fn add_fact(&mut self, fact: &Fact);

    /// The fact changed; subsequent matching must see `fact`.
    fn update_fact(&mut self, fact: &Fact);

    /// Start tracking a production's condition.
    fn add_production(&mut self, id: ProductionId, condition: Arc<dyn Condition>);

    /// Stop tracking a production. Returns `false` if it was unknown.
    fn remove_production(&mut self, id: ProductionId) -> bool;

    /// Advance matching by one unit of work and report the conflict set:
    /// every production whose condition holds against the last notified
    /// fact, in registration order.
    fn run_step(&mut self) -> Vec<ProductionId>;
}

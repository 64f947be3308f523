//! Production registry and conflict resolution.

use deliberate_core::{LoopError, Production, ProductionError, ProductionId};
use std::collections::BTreeMap;

/// Registered productions keyed by registration order.
#[derive(Debug, Default)]
pub struct ProductionRegistry {
    entries: BTreeMap<ProductionId, Production>,
    next_id: u64,
}

impl ProductionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `production` under a fresh id. Duplicates are not detected.
    pub fn insert(&mut self, production: Production) -> ProductionId {
        let id = ProductionId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, production);
        id
    }

    pub fn remove(&mut self, id: ProductionId) -> Result<Production, ProductionError> {
        self.entries
            .remove(&id)
            .ok_or(ProductionError::NotFound(id))
    }

    pub fn get(&self, id: ProductionId) -> Option<&Production> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductionId, &Production)> {
        self.entries.iter().map(|(id, p)| (*id, p))
    }

    /// Pick the winner of a conflict set: highest priority, ties to the
    /// lowest id. Every id must be registered here.
    pub fn select(
        &self,
        conflict_set: &[ProductionId],
    ) -> Result<Option<(ProductionId, &Production)>, LoopError> {
        let mut best: Option<(ProductionId, &Production)> = None;
        for &id in conflict_set {
            let candidate = self
                .entries
                .get(&id)
                .ok_or(LoopError::UnknownProduction(id))?;
            best = match best {
                Some((best_id, current))
                    if current.priority() > candidate.priority()
                        || (current.priority() == candidate.priority() && best_id < id) =>
                {
                    Some((best_id, current))
                }
                _ => Some((id, candidate)),
            };
        }
        Ok(best)
    }
}

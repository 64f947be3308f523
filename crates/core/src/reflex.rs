//! Reflexes — fast predicate/action pairs polled outside deliberation.
//!
//! Predicate and action live on the same value so any state they share
//! (counters, seen-sets) is owned by the reflex itself.

use async_trait::async_trait;

use crate::error::ActionError;
use crate::memory::WorkingMemory;

#[async_trait]
pub trait Reflex: Send {
    /// Identifier used in logs and events.
    fn name(&self) -> &str;

    /// The predicate. Called on every poll pass.
    async fn check(&mut self) -> bool;

    /// The action, run each time `check` returns true.
    ///
    /// `memory` is `Some` only for forced reflexes, which hold the
    /// coordination lock while acting.
    async fn act(&mut self, memory: Option<&mut WorkingMemory>) -> Result<(), ActionError>;
}

/// Adapter building a [`Reflex`] from two synchronous closures.
pub struct FnReflex<P, A> {
    name: String,
    predicate: P,
    action: A,
}

/// Build a reflex from a predicate closure and an action closure.
pub fn reflex_fn<P, A>(name: impl Into<String>, predicate: P, action: A) -> FnReflex<P, A>
where
    P: FnMut() -> bool + Send,
    A: FnMut(Option<&mut WorkingMemory>) -> Result<(), ActionError> + Send,
{
    FnReflex {
        name: name.into(),
        predicate,
        action,
    }
}

#[async_trait]
impl<P, A> Reflex for FnReflex<P, A>
where
    P: FnMut() -> bool + Send,
    A: FnMut(Option<&mut WorkingMemory>) -> Result<(), ActionError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&mut self) -> bool {
        (self.predicate)()
    }

    async fn act(&mut self, memory: Option<&mut WorkingMemory>) -> Result<(), ActionError> {
        (self.action)(memory)
    }
}

//! # deliberate core
//!
//! Domain types, traits, and error definitions for the reactive-deliberative
//! control loop. This crate defines the model every other crate implements
//! against and carries no scheduling logic of its own.
//!
//! ## Layout
//!
//! - [`fact`] / [`memory`]: the single working-memory fact and the only
//!   mutation path to it, which keeps the matcher notified.
//! - [`matcher`]: the [`RuleMatcher`] capability the coordination layer
//!   consumes.
//! - [`production`]: condition-action rules with priority and timeout.
//! - [`reflex`]: fast predicate/action pairs.
//! - [`event`]: broadcast bus for engine events.

pub mod error;
pub mod event;
pub mod fact;
pub mod matcher;
pub mod memory;
pub mod production;
pub mod reflex;

// Re-export key types at crate root for ergonomics
pub use error::{ActionError, Error, FactError, LoopError, ProductionError, Result};
pub use event::{EngineEvent, EventBus, StopReason};
pub use fact::{Fact, FactKey};
pub use matcher::RuleMatcher;
pub use memory::WorkingMemory;
pub use production::{Action, Condition, FnAction, Pattern, Production, ProductionId, action_fn};
pub use reflex::{FnReflex, Reflex, reflex_fn};

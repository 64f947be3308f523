//! # deliberate engine
//!
//! Scheduling and coordination for the reactive-deliberative loop: the
//! production registry and conflict resolution, the deliberation cycle with
//! its action timeout, the reflex poller, and the facade tying them together
//! behind one coordination lock.

pub mod deliberation;
pub mod reactive;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod stats;

pub use deliberation::{CycleOutcome, EngineState};
pub use reactive::{ReactiveEntry, ReactiveRegistry};
pub use registry::ProductionRegistry;
pub use runtime::{LoopHandle, ReactiveDeliberative};
pub use settings::EngineSettings;
pub use stats::{LoopStats, StatsSnapshot};

//! The deliberation cycle: match, resolve, fire under a time budget.
//!
//! One cycle takes the coordination lock, asks the matcher for the conflict
//! set, fires the winning production, and releases the lock. The loop then
//! sleeps for the idle delay and repeats until cancelled.

use chrono::Utc;
use deliberate_core::{ActionError, EngineEvent, LoopError, WorkingMemory};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::registry::ProductionRegistry;
use crate::runtime::Shared;

/// Everything the coordination lock protects.
#[derive(Debug)]
pub struct EngineState {
    pub memory: WorkingMemory,
    pub registry: ProductionRegistry,
}

/// Result of one deliberation cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The conflict set was empty.
    NoMatch,
    /// The winning action ran to completion.
    Fired { production: String, duration: Duration },
    /// The action was abandoned at its deadline. Mutations it made before
    /// the deadline are kept.
    TimedOut { production: String, timeout: Duration },
    /// The action returned an error.
    Failed { production: String, error: ActionError },
}

impl CycleOutcome {
    /// Name of the production that fired, if any.
    pub fn production(&self) -> Option<&str> {
        match self {
            Self::NoMatch => None,
            Self::Fired { production, .. }
            | Self::TimedOut { production, .. }
            | Self::Failed { production, .. } => Some(production),
        }
    }
}

/// Resolve and fire one production. The caller holds the lock.
pub async fn fire_step(
    state: &mut EngineState,
    default_timeout: Duration,
) -> Result<CycleOutcome, LoopError> {
    let conflict_set = state.memory.conflict_set();
    let Some((id, production)) = state.registry.select(&conflict_set)? else {
        return Ok(CycleOutcome::NoMatch);
    };
    // Cheap: condition and action are reference-counted.
    let production = production.clone();
    let budget = production.timeout().unwrap_or(default_timeout);

    debug!(
        production = %production.name(),
        id = %id,
        priority = production.priority(),
        candidates = conflict_set.len(),
        "Firing production"
    );

    let started = Instant::now();
    let outcome = match tokio::time::timeout(budget, production.action().fire(&mut state.memory))
        .await
    {
        Ok(Ok(())) => CycleOutcome::Fired {
            production: production.name().to_string(),
            duration: started.elapsed(),
        },
        Ok(Err(error)) => CycleOutcome::Failed {
            production: production.name().to_string(),
            error,
        },
        Err(_) => CycleOutcome::TimedOut {
            production: production.name().to_string(),
            timeout: budget,
        },
    };
    Ok(outcome)
}

/// Run one full cycle against the shared state: lock, fire, record.
pub(crate) async fn cycle(shared: &Shared) -> Result<CycleOutcome, LoopError> {
    let number = shared.stats.begin_cycle();
    let started = Instant::now();

    let outcome = {
        let mut state = shared.state.lock().await;
        fire_step(&mut state, shared.settings.default_timeout).await?
    };

    shared.stats.record(&outcome);
    let event = match &outcome {
        CycleOutcome::NoMatch | CycleOutcome::Fired { .. } => {
            debug!(cycle = number, production = ?outcome.production(), "Cycle complete");
            EngineEvent::CycleCompleted {
                cycle: number,
                production: outcome.production().map(str::to_string),
                duration_ms: started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            }
        }
        CycleOutcome::TimedOut { production, timeout } => {
            warn!(
                cycle = number,
                production = %production,
                timeout_ms = timeout.as_millis() as u64,
                "Production action timed out"
            );
            EngineEvent::ActionTimedOut {
                cycle: number,
                production: production.clone(),
                timeout_ms: timeout.as_millis() as u64,
                timestamp: Utc::now(),
            }
        }
        CycleOutcome::Failed { production, error } => {
            warn!(
                cycle = number,
                production = %production,
                error = %error,
                "Production action failed"
            );
            EngineEvent::ActionFailed {
                cycle: number,
                production: production.clone(),
                error_message: error.to_string(),
                timestamp: Utc::now(),
            }
        }
    };
    shared.events.publish(event);
    Ok(outcome)
}

/// Repeat cycles until `cancel` flips to true or its sender is dropped.
///
/// Cancellation is observed before each cycle and during the idle sleep;
/// an in-flight fire step is only cut short by its own timeout.
pub(crate) async fn run_loop(
    shared: std::sync::Arc<Shared>,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), LoopError> {
    info!(
        idle_delay_ms = shared.settings.idle_delay.as_millis() as u64,
        default_timeout_ms = shared.settings.default_timeout.as_millis() as u64,
        "Deliberation loop started"
    );

    loop {
        if *cancel.borrow() {
            break;
        }

        if let Err(e) = cycle(&shared).await {
            error!(error = %e, cycles = shared.stats.cycles(), "Deliberation loop stopped");
            return Err(e);
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.settings.idle_delay) => {}
            changed = cancel.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!(cycles = shared.stats.cycles(), "Deliberation loop cancelled");
    Ok(())
}

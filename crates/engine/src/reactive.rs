//! Reflex registry and the poller that drives it.
//!
//! The poller runs beside the deliberation loop. Each pass evaluates every
//! predicate in registration order, yielding between evaluations. Forced
//! reflexes act under the coordination lock; the rest act without it and
//! may overlap an in-flight fire step.

use chrono::Utc;
use deliberate_core::{EngineEvent, LoopError, Reflex};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::runtime::Shared;

/// A registered reflex and its force flag.
pub struct ReactiveEntry {
    reflex: Box<dyn Reflex>,
    force: bool,
}

impl ReactiveEntry {
    pub fn name(&self) -> &str {
        self.reflex.name()
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }
}

impl std::fmt::Debug for ReactiveEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveEntry")
            .field("reflex", &self.reflex.name())
            .field("force", &self.force)
            .finish()
    }
}

/// Reflexes waiting for the loop to start. Sealed once the poller takes them.
#[derive(Debug, Default)]
pub struct ReactiveRegistry {
    entries: Vec<ReactiveEntry>,
    sealed: bool,
}

impl ReactiveRegistry {
    pub fn register(&mut self, reflex: Box<dyn Reflex>, force: bool) -> Result<(), LoopError> {
        if self.sealed {
            return Err(LoopError::ReflexesSealed);
        }
        debug!(reflex = %reflex.name(), force, "Reflex registered");
        self.entries.push(ReactiveEntry { reflex, force });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Hand every entry to the poller and refuse further registrations.
    pub(crate) fn seal(&mut self) -> Vec<ReactiveEntry> {
        self.sealed = true;
        std::mem::take(&mut self.entries)
    }
}

/// Poll `entries` until cancelled.
pub(crate) async fn poll_loop(
    shared: Arc<Shared>,
    mut entries: Vec<ReactiveEntry>,
    mut cancel: watch::Receiver<bool>,
) {
    info!(
        reflexes = entries.len(),
        poll_interval_ms = shared.settings.poll_interval.as_millis() as u64,
        "Reactive poller started"
    );

    'poll: loop {
        for entry in entries.iter_mut() {
            if is_cancelled(&cancel) {
                break 'poll;
            }
            if entry.reflex.check().await {
                run_entry(&shared, entry).await;
            }
            tokio::task::yield_now().await;
        }

        if shared.settings.poll_interval.is_zero() {
            tokio::task::yield_now().await;
            continue;
        }
        tokio::select! {
            _ = tokio::time::sleep(shared.settings.poll_interval) => {}
            changed = cancel.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("Reactive poller stopped");
}

fn is_cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow() || cancel.has_changed().is_err()
}

async fn run_entry(shared: &Shared, entry: &mut ReactiveEntry) {
    let result = if entry.force {
        let mut state = shared.state.lock().await;
        entry.reflex.act(Some(&mut state.memory)).await
    } else {
        entry.reflex.act(None).await
    };

    let name = entry.reflex.name().to_string();
    match result {
        Ok(()) => {
            debug!(reflex = %name, forced = entry.force, "Reflex fired");
            shared.stats.record_reflex(true);
            shared.events.publish(EngineEvent::ReflexFired {
                reflex: name,
                forced: entry.force,
                timestamp: Utc::now(),
            });
        }
        Err(e) => {
            warn!(reflex = %name, error = %e, "Reflex action failed");
            shared.stats.record_reflex(false);
            shared.events.publish(EngineEvent::ReflexFailed {
                reflex: name,
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

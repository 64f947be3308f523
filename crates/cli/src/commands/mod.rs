//! Subcommand implementations and the glue they share.

pub mod check;
pub mod demo;
pub mod init;
pub mod run;
pub mod status;

use deliberate_config::{AppConfig, ConfigError};
use deliberate_core::EngineEvent;
use deliberate_engine::ReactiveDeliberative;
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Load from `path`, or from the default location when none is given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
}

/// Build an engine from `config`: seed facts, register enabled rules and
/// every reflex.
pub async fn assemble(config: &AppConfig) -> deliberate_core::Result<ReactiveDeliberative> {
    let productions = deliberate_rules::build_productions(config)?;
    let reflexes = deliberate_rules::build_reflexes(config)?;

    let engine = ReactiveDeliberative::from_config(config).await;
    for production in productions {
        engine.add_production(production).await;
    }
    for (reflex, force) in reflexes {
        engine.add_boxed_reactive_action(reflex, force).await?;
    }
    Ok(engine)
}

/// Start `engine` and wait until Ctrl-C, `cycles` deliberation cycles, or
/// a fatal stop.
pub async fn drive(
    engine: &ReactiveDeliberative,
    cycles: Option<u64>,
) -> deliberate_core::Result<()> {
    let mut events = engine.subscribe();
    let handle = engine.start().await?;

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping loop");
                break handle.shutdown().await;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    let cycle_ended = report(&event);
                    if matches!(event.as_ref(), EngineEvent::LoopStopped { .. }) {
                        break handle.join().await;
                    }
                    if cycle_ended && cycles.is_some_and(|n| engine.stats().cycles >= n) {
                        break handle.shutdown().await;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event stream lagged"),
                Err(RecvError::Closed) => break handle.join().await,
            },
        }
    };

    result?;
    Ok(())
}

/// Print one event. Returns true when it marks the end of a cycle.
fn report(event: &EngineEvent) -> bool {
    match event {
        EngineEvent::CycleCompleted {
            cycle, production, ..
        } => {
            match production {
                Some(name) => println!("  [{cycle:>4}] fired {name}"),
                None => println!("  [{cycle:>4}] idle"),
            }
            true
        }
        EngineEvent::ActionTimedOut {
            cycle,
            production,
            timeout_ms,
            ..
        } => {
            println!("  [{cycle:>4}] {production} timed out after {timeout_ms}ms");
            true
        }
        EngineEvent::ActionFailed {
            cycle,
            production,
            error_message,
            ..
        } => {
            println!("  [{cycle:>4}] {production} failed: {error_message}");
            true
        }
        EngineEvent::ReflexFired { reflex, forced, .. } => {
            println!("         reflex {reflex}{}", if *forced { " (forced)" } else { "" });
            false
        }
        EngineEvent::ReflexFailed {
            reflex,
            error_message,
            ..
        } => {
            println!("         reflex {reflex} failed: {error_message}");
            false
        }
        EngineEvent::LoopStopped { .. } => false,
    }
}

/// Print the engine's counters.
pub fn print_stats(engine: &ReactiveDeliberative) {
    let stats = engine.stats();
    println!("\n📊 Statistics");
    println!("  Cycles:          {}", stats.cycles);
    println!("  Fired:           {}", stats.fired);
    println!("  Idle:            {}", stats.idle);
    println!("  Timeouts:        {}", stats.timeouts);
    println!("  Failures:        {}", stats.failures);
    println!("  Reflex runs:     {}", stats.reflex_runs);
    println!("  Reflex failures: {}", stats.reflex_failures);
}

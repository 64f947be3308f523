//! `deliberate demo` — Built-in traffic-light agent.
//!
//! Two rules alternate the light. A forced reflex raises a siren every few
//! cycles, and a higher-priority rule handles it before the light changes.

use deliberate_config::EffectConfig;
use deliberate_core::{Pattern, Production, action_fn};
use deliberate_engine::{EngineSettings, ReactiveDeliberative};
use deliberate_rules::Every;
use std::time::Duration;

fn traffic_light() -> [Production; 3] {
    [
        Production::new(
            "stop",
            Pattern::new().require("light_color", "red"),
            action_fn(|memory| {
                println!("         🔴 Stop!");
                memory.assign("light_color", "green");
                Ok(())
            }),
        ),
        Production::new(
            "go",
            Pattern::new().require("light_color", "green"),
            action_fn(|memory| {
                println!("         🟢 Go!");
                memory.assign("light_color", "red");
                Ok(())
            }),
        ),
        Production::new(
            "yield_to_siren",
            Pattern::new().require("siren", true),
            action_fn(|memory| {
                println!("         🚨 Emergency vehicle, pulling over");
                memory.unset(&"siren".into())?;
                Ok(())
            }),
        )
        .with_priority(10),
    ]
}

pub async fn run(cycles: u64, idle_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    let settings = EngineSettings::default().with_idle_delay(Duration::from_millis(idle_ms));
    let engine = ReactiveDeliberative::with_settings(settings);

    engine.set_fact("light_color", "red").await;
    for production in traffic_light() {
        engine.add_production(production).await;
    }

    let siren_every = Duration::from_millis(idle_ms.saturating_mul(3).max(1));
    engine
        .add_reactive_action(
            Every::new(
                "siren",
                siren_every,
                &[EffectConfig::Set {
                    key: Some("siren".into()),
                    value: serde_json::Value::Bool(true),
                }],
            ),
            true,
        )
        .await?;

    println!("🚦 Traffic-light demo — {cycles} cycles, {idle_ms}ms apart\n");
    super::drive(&engine, Some(cycles)).await?;
    super::print_stats(&engine);
    Ok(())
}

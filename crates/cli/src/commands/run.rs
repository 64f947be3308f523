//! `deliberate run` — Run the configured agent.

use deliberate_core::Error;
use std::path::PathBuf;

pub async fn run(
    config_path: Option<PathBuf>,
    cycles: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;
    let engine = super::assemble(&config).await?;

    let settings = engine.settings();
    println!("🧠 deliberate — Starting agent");
    println!("   Rules:       {}", config.enabled_rules().count());
    println!("   Reflexes:    {}", config.reflexes.len());
    println!("   Idle delay:  {}ms", settings.idle_delay.as_millis());
    match cycles {
        Some(n) => println!("   Stopping after {n} cycles\n"),
        None => println!("   Press Ctrl-C to stop\n"),
    }

    let result = super::drive(&engine, cycles).await;
    super::print_stats(&engine);
    let rendered = serde_json::to_string_pretty(&engine.fact().await.to_json())
        .map_err(|e| Error::Internal(format!("failed to render fact: {e}")))?;
    println!("\n📋 Final fact:\n{rendered}");
    Ok(result?)
}

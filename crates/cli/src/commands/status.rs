//! `deliberate status` — Show resolved settings.

use deliberate_config::AppConfig;
use std::path::PathBuf;

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;
    let path = config_path.unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("🧠 deliberate Status");
    println!("====================");
    println!("  Config file:      {}", path.display());
    println!("  Idle delay:       {}ms", config.deliberation.idle_delay_ms);
    println!("  Default timeout:  {}ms", config.deliberation.default_timeout_ms);
    println!("  Poll interval:    {}ms", config.reactive.poll_interval_ms);
    println!("  Event capacity:   {}", config.events.capacity);
    println!("  Log level:        {}", config.logging.level);
    println!("  Log format:       {}", if config.logging.json { "json" } else { "text" });
    println!("  Initial facts:    {}", config.facts.len());
    println!(
        "  Rules:            {} ({} enabled)",
        config.rules.len(),
        config.enabled_rules().count()
    );
    println!(
        "  Reflexes:         {} ({} forced)",
        config.reflexes.len(),
        config.reflexes.iter().filter(|r| r.force).count()
    );

    if path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `deliberate init` first");
    }

    Ok(())
}

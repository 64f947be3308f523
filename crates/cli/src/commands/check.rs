//! `deliberate check` — Validate configuration, rules and reflexes.

use deliberate_config::AppConfig;
use std::path::PathBuf;

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    println!("🔍 Checking {}", path.display());

    let config = match AppConfig::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ {e}");
            return Err(e.into());
        }
    };
    println!("  ✅ Config valid");

    let mut errors = 0;
    for rule in &config.rules {
        match deliberate_rules::build_production(rule) {
            Ok(production) => {
                let timeout = production
                    .timeout()
                    .map(|t| format!("{}ms", t.as_millis()))
                    .unwrap_or_else(|| format!("{}ms (default)", config.deliberation.default_timeout_ms));
                println!(
                    "  ✅ rule {:<20} priority {:>3}  timeout {:<18} {}{}",
                    production.name(),
                    production.priority(),
                    timeout,
                    production.condition().describe(),
                    if rule.enabled { "" } else { "  [disabled]" }
                );
            }
            Err(e) => {
                errors += 1;
                println!("  ❌ {e}");
            }
        }
    }

    for reflex in &config.reflexes {
        match deliberate_rules::build_reflex(reflex) {
            Ok(_) => println!(
                "  ✅ reflex {:<18} {:?}{}",
                reflex.name,
                reflex.trigger,
                if reflex.force { "  [forced]" } else { "" }
            ),
            Err(e) => {
                errors += 1;
                println!("  ❌ {e}");
            }
        }
    }

    if errors > 0 {
        return Err(format!("{errors} rule(s) or reflex(es) failed to build").into());
    }
    println!(
        "\n  {} rule(s), {} reflex(es) ready",
        config.rules.len(),
        config.reflexes.len()
    );
    Ok(())
}

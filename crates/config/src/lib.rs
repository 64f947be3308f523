//! Configuration loading, validation, and management for deliberate.
//!
//! Loads configuration from `~/.deliberate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use deliberate_core::FactKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.deliberate/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deliberation loop timing
    #[serde(default)]
    pub deliberation: DeliberationConfig,

    /// Reflex poller timing
    #[serde(default)]
    pub reactive: ReactiveConfig,

    /// Event bus settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named attributes the fact starts with
    #[serde(default)]
    pub facts: BTreeMap<String, serde_json::Value>,

    /// Declarative productions
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Declarative reflexes
    #[serde(default)]
    pub reflexes: Vec<ReflexConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationConfig {
    /// Sleep between deliberation cycles
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Action timeout for productions that don't set their own
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
}

fn default_idle_delay_ms() -> u64 {
    1000
}
fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for DeliberationConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: default_idle_delay_ms(),
            default_timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactiveConfig {
    /// Pause between poll passes. 0 = yield only.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    10
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Broadcast channel capacity
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

/// Largest accepted `events.capacity`.
pub const MAX_EVENT_CAPACITY: usize = 1 << 16;

fn default_event_capacity() -> usize {
    256
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// A declarative production.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique name for this rule
    pub name: String,

    /// Condition expression (e.g. `light_color == "red" AND NOT #0 EXISTS`).
    /// Empty matches every fact.
    #[serde(default)]
    pub condition: String,

    /// Priority (higher = fires first)
    #[serde(default)]
    pub priority: i32,

    /// Per-rule action timeout; falls back to `deliberation.default_timeout_ms`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Effects applied in order when the rule fires
    #[serde(default)]
    pub effects: Vec<EffectConfig>,

    /// Whether this rule is registered (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// One step of a scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectConfig {
    /// Assign an attribute. Without `key`, appends under a fresh positional index.
    Set {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<FactKey>,
        value: serde_json::Value,
    },
    /// Remove an attribute; fails if absent.
    Unset { key: FactKey },
    /// Add `by` to a numeric attribute, treating a missing one as 0.
    Increment {
        key: FactKey,
        #[serde(default = "default_increment")]
        by: i64,
    },
    /// Emit a log line. `{key}` placeholders are filled from the fact.
    Log { message: String },
    /// Wait without releasing working memory.
    Sleep { ms: u64 },
}

fn default_increment() -> i64 {
    1
}

impl EffectConfig {
    /// Whether this effect writes to working memory.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Self::Set { .. } | Self::Unset { .. } | Self::Increment { .. }
        )
    }
}

/// A declarative reflex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflexConfig {
    pub name: String,

    /// What the reflex watches for
    pub trigger: ReflexTrigger,

    /// Run under the coordination lock with access to working memory
    #[serde(default)]
    pub force: bool,

    #[serde(default)]
    pub effects: Vec<EffectConfig>,
}

/// The predicate side of a declarative reflex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReflexTrigger {
    /// Fires once for every file that appears in `path`.
    WatchDir { path: PathBuf },
    /// Fires when `interval_ms` has elapsed since it last fired.
    Every { interval_ms: u64 },
}

impl AppConfig {
    /// Load configuration from the default path (~/.deliberate/config.toml).
    ///
    /// Environment overrides:
    /// - `DELIBERATE_IDLE_DELAY_MS`
    /// - `DELIBERATE_POLL_INTERVAL_MS`
    /// - `DELIBERATE_LOG_LEVEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `DELIBERATE_*` overrides resolved through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DELIBERATE_IDLE_DELAY_MS") {
            self.deliberation.idle_delay_ms = parse_ms("DELIBERATE_IDLE_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("DELIBERATE_POLL_INTERVAL_MS") {
            self.reactive.poll_interval_ms = parse_ms("DELIBERATE_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(level) = lookup("DELIBERATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".deliberate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deliberation.default_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "deliberation.default_timeout_ms must be > 0".into(),
            ));
        }

        if self.events.capacity == 0 || self.events.capacity > MAX_EVENT_CAPACITY {
            return Err(ConfigError::ValidationError(format!(
                "events.capacity must be between 1 and {MAX_EVENT_CAPACITY}"
            )));
        }

        let mut names = HashSet::new();
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "rule names must not be empty".into(),
                ));
            }
            if !names.insert(rule.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate rule name '{}'",
                    rule.name
                )));
            }
            if rule.timeout_ms == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "rule '{}': timeout_ms must be > 0",
                    rule.name
                )));
            }
        }

        for reflex in &self.reflexes {
            if reflex.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "reflex names must not be empty".into(),
                ));
            }
            if reflex.trigger == (ReflexTrigger::Every { interval_ms: 0 }) {
                return Err(ConfigError::ValidationError(format!(
                    "reflex '{}': interval_ms must be > 0",
                    reflex.name
                )));
            }
        }

        Ok(())
    }

    /// Rules with `enabled = true`.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &RuleConfig> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::starter()).unwrap_or_default()
    }

    /// A starter configuration: the traffic-light agent.
    pub fn starter() -> Self {
        let mut facts = BTreeMap::new();
        facts.insert("light_color".to_string(), serde_json::json!("red"));

        Self {
            facts,
            rules: vec![
                RuleConfig {
                    name: "stop_on_red".into(),
                    condition: r#"light_color == "red""#.into(),
                    priority: 0,
                    timeout_ms: None,
                    effects: vec![
                        EffectConfig::Log {
                            message: "Light is {light_color}, stopping".into(),
                        },
                        EffectConfig::Set {
                            key: Some(FactKey::name("light_color")),
                            value: serde_json::json!("green"),
                        },
                    ],
                    enabled: true,
                },
                RuleConfig {
                    name: "go_on_green".into(),
                    condition: r#"light_color == "green""#.into(),
                    priority: 0,
                    timeout_ms: None,
                    effects: vec![
                        EffectConfig::Log {
                            message: "Light is {light_color}, going".into(),
                        },
                        EffectConfig::Set {
                            key: Some(FactKey::name("light_color")),
                            value: serde_json::json!("red"),
                        },
                    ],
                    enabled: true,
                },
            ],
            ..Self::default()
        }
    }
}

fn parse_ms(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{var} must be a whole number of milliseconds, got '{raw}'"))
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for deliberate_core::Error {
    fn from(e: ConfigError) -> Self {
        deliberate_core::Error::Config {
            message: e.to_string(),
        }
    }
}

//! Declarative rules — productions and reflexes described in configuration.
//!
//! A rule pairs a condition expression over fact attributes with a list of
//! scripted effects:
//!
//! ```toml
//! [[rules]]
//! name = "load"
//! condition = 'state == "not loaded"'
//! priority = 2
//! timeout_ms = 500
//! [[rules.effects]]
//! type = "set"
//! key = "state"
//! value = "loaded"
//! ```
//!
//! Reflexes pick a trigger instead of a condition. Only forced reflexes may
//! carry effects that write to working memory.

pub mod condition;
pub mod effects;
pub mod reflex;

use deliberate_config::{AppConfig, ReflexConfig, ReflexTrigger, RuleConfig};
use deliberate_core::{Production, Reflex};
use std::time::Duration;

pub use condition::{Expr, ParsedCondition, parse_condition};
pub use effects::ScriptedAction;
pub use reflex::{Every, WatchDir};

/// Result of building rules or reflexes.
pub type RuleResult<T> = std::result::Result<T, RuleError>;

/// Errors from building declarative rules and reflexes.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("condition parse error in rule '{name}': {detail}")]
    ConditionParseError { name: String, detail: String },

    #[error("reflex '{name}' writes to working memory but is not forced")]
    UnforcedMutation { name: String },
}

impl From<RuleError> for deliberate_core::Error {
    fn from(e: RuleError) -> Self {
        deliberate_core::Error::Config {
            message: e.to_string(),
        }
    }
}

/// Build a production from a `[[rules]]` entry.
pub fn build_production(rule: &RuleConfig) -> RuleResult<Production> {
    if rule.name.trim().is_empty() {
        return Err(RuleError::InvalidRule {
            name: rule.name.clone(),
            reason: "name must not be empty".into(),
        });
    }
    if rule.timeout_ms == Some(0) {
        return Err(RuleError::InvalidRule {
            name: rule.name.clone(),
            reason: "timeout_ms must be > 0".into(),
        });
    }

    let condition =
        ParsedCondition::parse(&rule.condition).map_err(|detail| RuleError::ConditionParseError {
            name: rule.name.clone(),
            detail,
        })?;

    let mut production = Production::new(
        rule.name.clone(),
        condition,
        ScriptedAction::new(rule.name.clone(), &rule.effects),
    )
    .with_priority(rule.priority);
    if let Some(ms) = rule.timeout_ms {
        production = production.with_timeout(Duration::from_millis(ms));
    }
    Ok(production)
}

/// Build a reflex from a `[[reflexes]]` entry. The caller registers it with
/// `reflex.force`.
pub fn build_reflex(reflex: &ReflexConfig) -> RuleResult<Box<dyn Reflex>> {
    if !reflex.force && reflex.effects.iter().any(|e| e.mutates()) {
        return Err(RuleError::UnforcedMutation {
            name: reflex.name.clone(),
        });
    }

    let built: Box<dyn Reflex> = match &reflex.trigger {
        ReflexTrigger::WatchDir { path } => {
            Box::new(WatchDir::new(reflex.name.clone(), path.clone(), &reflex.effects))
        }
        ReflexTrigger::Every { interval_ms } => {
            if *interval_ms == 0 {
                return Err(RuleError::InvalidRule {
                    name: reflex.name.clone(),
                    reason: "interval_ms must be > 0".into(),
                });
            }
            Box::new(Every::new(
                reflex.name.clone(),
                Duration::from_millis(*interval_ms),
                &reflex.effects,
            ))
        }
    };
    Ok(built)
}

/// Build every enabled rule in `config`, in file order.
pub fn build_productions(config: &AppConfig) -> RuleResult<Vec<Production>> {
    config.enabled_rules().map(build_production).collect()
}

/// Build every reflex in `config`, paired with its force flag.
pub fn build_reflexes(config: &AppConfig) -> RuleResult<Vec<(Box<dyn Reflex>, bool)>> {
    config
        .reflexes
        .iter()
        .map(|r| build_reflex(r).map(|built| (built, r.force)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deliberate_config::EffectConfig;
    use deliberate_core::Fact;
    use serde_json::json;

    fn rule(name: &str, condition: &str) -> RuleConfig {
        RuleConfig {
            name: name.into(),
            condition: condition.into(),
            priority: 0,
            timeout_ms: None,
            effects: vec![],
            enabled: true,
        }
    }

    #[test]
    fn builds_production_with_metadata() {
        let mut cfg = rule("load", r#"state == "not loaded""#);
        cfg.priority = 2;
        cfg.timeout_ms = Some(250);

        let p = build_production(&cfg).unwrap();
        assert_eq!(p.name(), "load");
        assert_eq!(p.priority(), 2);
        assert_eq!(p.timeout(), Some(Duration::from_millis(250)));
        assert!(p.condition().matches(&Fact::new().with("state", "not loaded")));
        assert_eq!(p.condition().describe(), r#"state == "not loaded""#);
    }

    #[test]
    fn bad_condition_names_the_rule() {
        let err = build_production(&rule("broken", "state ==")).unwrap_err();
        assert!(matches!(err, RuleError::ConditionParseError { ref name, .. } if name == "broken"));
    }

    #[test]
    fn empty_name_is_invalid() {
        assert!(matches!(
            build_production(&rule(" ", "")).unwrap_err(),
            RuleError::InvalidRule { .. }
        ));
    }

    #[test]
    fn unforced_mutation_rejected() {
        let reflex = ReflexConfig {
            name: "uploads".into(),
            trigger: ReflexTrigger::WatchDir {
                path: "/tmp/uploads".into(),
            },
            force: false,
            effects: vec![EffectConfig::Set {
                key: None,
                value: json!("x"),
            }],
        };
        assert!(matches!(
            build_reflex(&reflex),
            Err(RuleError::UnforcedMutation { .. })
        ));

        let forced = ReflexConfig {
            force: true,
            ..reflex
        };
        assert_eq!(build_reflex(&forced).unwrap().name(), "uploads");
    }

    #[test]
    fn rule_errors_surface_as_config_errors() {
        let err: deliberate_core::Error = build_production(&rule("broken", "state =="))
            .err()
            .unwrap()
            .into();
        assert!(matches!(
            &err,
            deliberate_core::Error::Config { message } if message.contains("broken")
        ));
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let mut config = AppConfig::starter();
        config.rules[1].enabled = false;
        let built = build_productions(&config).unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].name(), "stop_on_red");
    }
}

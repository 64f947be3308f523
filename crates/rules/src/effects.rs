//! Scripted effects: the action side of declarative rules and reflexes.

use async_trait::async_trait;
use deliberate_config::EffectConfig;
use deliberate_core::{Action, ActionError, FactKey, WorkingMemory};
use regex_lite::{Captures, Regex};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

use crate::condition::render;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{([^{}\s]+)\}").ok());

/// Fill `{name}` placeholders from `vars`, then from the fact. Unknown
/// placeholders are left as they are.
pub fn render_template(
    template: &str,
    vars: &BTreeMap<&str, String>,
    memory: Option<&WorkingMemory>,
) -> String {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return template.to_string();
    };
    re.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        vars.get(name)
            .cloned()
            .or_else(|| {
                memory
                    .and_then(|m| m.get(&FactKey::parse(name)))
                    .map(render)
            })
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// Apply `effects` in order. `origin` names the rule or reflex in logs.
///
/// Mutating effects need `memory`; without it they fail.
pub async fn apply(
    effects: &[EffectConfig],
    mut memory: Option<&mut WorkingMemory>,
    origin: &str,
    vars: &BTreeMap<&str, String>,
) -> Result<(), ActionError> {
    for effect in effects {
        match effect {
            EffectConfig::Log { message } => {
                let line = render_template(message, vars, memory.as_deref());
                info!(origin = %origin, "{line}");
            }
            EffectConfig::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            EffectConfig::Set { key, value } => {
                let memory = require(memory.as_deref_mut(), origin)?;
                let key = memory.set(key.clone(), value.clone());
                debug!(origin = %origin, key = %key, "Effect set");
            }
            EffectConfig::Unset { key } => {
                let memory = require(memory.as_deref_mut(), origin)?;
                memory.unset(key)?;
                debug!(origin = %origin, key = %key, "Effect unset");
            }
            EffectConfig::Increment { key, by } => {
                let memory = require(memory.as_deref_mut(), origin)?;
                let next = match memory.get(key) {
                    None => Json::from(*by),
                    Some(Json::Number(n)) if n.is_i64() || n.is_u64() => n
                        .as_i64()
                        .and_then(|v| v.checked_add(*by))
                        .map(Json::from)
                        .ok_or_else(|| ActionError::failed(format!("{key} overflowed")))?,
                    Some(Json::Number(n)) => {
                        Json::from(n.as_f64().unwrap_or_default() + *by as f64)
                    }
                    Some(_) => {
                        return Err(ActionError::failed(format!("{key} is not numeric")));
                    }
                };
                memory.assign(key.clone(), next);
            }
        }
    }
    Ok(())
}

fn require<'a>(
    memory: Option<&'a mut WorkingMemory>,
    origin: &str,
) -> Result<&'a mut WorkingMemory, ActionError> {
    memory.ok_or_else(|| {
        ActionError::failed(format!("'{origin}' has no working memory access"))
    })
}

/// A production action that runs a list of configured effects.
#[derive(Debug, Clone)]
pub struct ScriptedAction {
    rule: String,
    effects: Vec<EffectConfig>,
}

impl ScriptedAction {
    pub fn new(rule: impl Into<String>, effects: &[EffectConfig]) -> Self {
        Self {
            rule: rule.into(),
            effects: effects.to_vec(),
        }
    }

    pub fn effects(&self) -> &[EffectConfig] {
        &self.effects
    }
}

#[async_trait]
impl Action for ScriptedAction {
    async fn fire(&self, memory: &mut WorkingMemory) -> Result<(), ActionError> {
        apply(&self.effects, Some(memory), &self.rule, &BTreeMap::new()).await
    }
}

//! Productions — condition-action rules with priority and timeout.
//!
//! The condition is opaque to the coordination layer: it is handed to the
//! [`RuleMatcher`](crate::matcher::RuleMatcher), which decides what matches.
//! The action is what the deliberation loop runs when the production wins
//! conflict resolution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ActionError;
use crate::fact::{Fact, FactKey};
use crate::memory::WorkingMemory;

/// Registration handle of a production. Assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductionId(pub u64);

impl fmt::Display for ProductionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A condition pattern tested against the fact.
pub trait Condition: Send + Sync {
    fn matches(&self, fact: &Fact) -> bool;

    /// Human-readable rendering for logs and `check` output.
    fn describe(&self) -> String {
        "<predicate>".into()
    }
}

impl<F> Condition for F
where
    F: Fn(&Fact) -> bool + Send + Sync,
{
    fn matches(&self, fact: &Fact) -> bool {
        self(fact)
    }
}

/// Conjunction of attribute equality tests, e.g. `light_color == "red"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    tests: Vec<(FactKey, Value)>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to be present and equal to `value`.
    pub fn require(mut self, key: impl Into<FactKey>, value: impl Into<Value>) -> Self {
        self.tests.push((key.into(), value.into()));
        self
    }
}

impl Condition for Pattern {
    fn matches(&self, fact: &Fact) -> bool {
        self.tests
            .iter()
            .all(|(key, expected)| fact.get(key) == Some(expected))
    }

    fn describe(&self) -> String {
        if self.tests.is_empty() {
            return "<always>".into();
        }
        self.tests
            .iter()
            .map(|(k, v)| format!("{k} == {v}"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// The work a production performs when it fires.
///
/// The action gets exclusive access to working memory for its whole run.
/// Every mutation it makes through [`WorkingMemory`] is pushed to the
/// matcher immediately, so mutations made before a timeout are kept.
#[async_trait]
pub trait Action: Send + Sync {
    async fn fire(&self, memory: &mut WorkingMemory) -> Result<(), ActionError>;
}

/// Adapter turning a synchronous closure into an [`Action`].
pub struct FnAction<F>(F);

/// Wrap a synchronous closure as an [`Action`].
pub fn action_fn<F>(f: F) -> FnAction<F>
where
    F: Fn(&mut WorkingMemory) -> Result<(), ActionError> + Send + Sync,
{
    FnAction(f)
}

#[async_trait]
impl<F> Action for FnAction<F>
where
    F: Fn(&mut WorkingMemory) -> Result<(), ActionError> + Send + Sync,
{
    async fn fire(&self, memory: &mut WorkingMemory) -> Result<(), ActionError> {
        (self.0)(memory)
    }
}

/// A registered rule. Immutable once built.
#[derive(Clone)]
pub struct Production {
    name: String,
    condition: Arc<dyn Condition>,
    action: Arc<dyn Action>,
    priority: i32,
    timeout: Option<Duration>,
}

impl Production {
    /// Create a production with priority 0 and the engine's default timeout.
    pub fn new(
        name: impl Into<String>,
        condition: impl Condition + 'static,
        action: impl Action + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            condition: Arc::new(condition),
            action: Arc::new(action),
            priority: 0,
            timeout: None,
        }
    }

    /// Higher fires first.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Upper bound on the action's wall-clock run time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The explicit timeout, if one was set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn condition(&self) -> Arc<dyn Condition> {
        Arc::clone(&self.condition)
    }

    pub fn action(&self) -> &dyn Action {
        self.action.as_ref()
    }
}

impl fmt::Debug for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Production")
            .field("name", &self.name)
            .field("condition", &self.condition.describe())
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .finish()
    }
}

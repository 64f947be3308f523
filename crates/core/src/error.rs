//! Error types for the deliberate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

use crate::fact::FactKey;
use crate::production::ProductionId;

/// The top-level error type for all deliberate operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Working memory errors ---
    #[error("Fact error: {0}")]
    Fact(#[from] FactError),

    // --- Production registry errors ---
    #[error("Production error: {0}")]
    Production(#[from] ProductionError),

    // --- Action errors ---
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    // --- Loop coordination errors ---
    #[error("Loop error: {0}")]
    Loop(#[from] LoopError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactError {
    #[error("Fact attribute not found: {0}")]
    NotFound(FactKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductionError {
    #[error("Production not found: {0}")]
    NotFound(ProductionId),
}

/// Errors raised by production actions and reflex actions.
///
/// Actions return this type so `?` works on working-memory operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("Action timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Action failed: {reason}")]
    Failed { reason: String },

    #[error(transparent)]
    Fact(#[from] FactError),
}

impl ActionError {
    /// Shorthand for [`ActionError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        ActionError::Failed {
            reason: reason.into(),
        }
    }
}

/// Errors from the coordination layer itself.
///
/// `UnknownProduction` and `Crashed` are fatal: the loop stops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopError {
    #[error("Loop is already running")]
    AlreadyRunning,

    #[error("Reactive actions cannot be registered after the loop has started")]
    ReflexesSealed,

    #[error("Matcher reported production {0} which is not in the registry")]
    UnknownProduction(ProductionId),

    #[error("Loop task crashed: {0}")]
    Crashed(String),
}

impl LoopError {
    /// Whether this error ends the loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoopError::UnknownProduction(_) | LoopError::Crashed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_error_displays_key() {
        let err = Error::Fact(FactError::NotFound(FactKey::name("state")));
        assert!(err.to_string().contains("state"));
    }

    #[test]
    fn action_error_wraps_fact_error() {
        let err: ActionError = FactError::NotFound(FactKey::Index(3)).into();
        assert!(err.to_string().contains("#3"));
        assert!(matches!(err, ActionError::Fact(_)));
    }

    #[test]
    fn timeout_displays_duration() {
        let err = ActionError::Timeout { timeout_ms: 250 };
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn result_alias_lifts_context_errors() {
        fn start() -> Result<()> {
            Err::<(), _>(LoopError::AlreadyRunning)?;
            Ok(())
        }
        assert!(matches!(start(), Err(Error::Loop(LoopError::AlreadyRunning))));
        assert_eq!(Error::Internal("render".into()).to_string(), "Internal error: render");
    }

    #[test]
    fn fatal_loop_errors() {
        assert!(LoopError::UnknownProduction(ProductionId(7)).is_fatal());
        assert!(LoopError::Crashed("boom".into()).is_fatal());
        assert!(!LoopError::AlreadyRunning.is_fatal());
        assert!(!LoopError::ReflexesSealed.is_fatal());
    }
}

//! Error types for the engine.
//!
//! Nothing here is meant to reach a player. Configuration problems are
//! skipped with a warning and handler failures are caught at the event
//! bus boundary; `EngineError` is how those failures are described and
//! logged.

use crate::bus::HandlerId;
use crate::combatant::CombatantHandle;
use thiserror::Error;

/// Errors that can occur while preparing or running a battle.
///
/// # Examples
///
/// ```rust
/// use zzpassive::EngineError;
///
/// let err = EngineError::UnknownPassive("glass_cannon".into());
/// assert_eq!(err.to_string(), "Unknown passive id: glass_cannon");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A configured passive id has no factory in the registry.
    #[error("Unknown passive id: {0}")]
    UnknownPassive(String),

    /// Two factories were registered under the same id.
    #[error("Passive id registered twice: {0}")]
    DuplicatePassive(String),

    /// A modifier carried an unusable value.
    #[error("Invalid modifier {name}: {reason}")]
    InvalidModifier { name: String, reason: String },

    /// A handle no longer resolves to a combatant in this battle.
    #[error("Combatant {0} is no longer in the battle")]
    StaleHandle(CombatantHandle),

    /// The bus dispatched to a handler the battle does not know.
    #[error("No handler registered for {0}")]
    UnknownHandler(HandlerId),

    /// A passive's trigger handler failed.
    #[error("Passive {passive} failed: {message}")]
    HandlerFailed { passive: String, message: String },

    /// A battle setup document could not be read.
    #[error("Invalid battle configuration: {0}")]
    Config(String),

    /// The battle has already ended.
    #[error("Battle has already ended")]
    BattleEnded,
}

impl EngineError {
    /// Wrap a failure raised inside the passive `passive`.
    pub fn handler(passive: &str, source: EngineError) -> Self {
        EngineError::HandlerFailed {
            passive: passive.to_string(),
            message: source.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

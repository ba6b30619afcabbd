//! Battle setup documents.
//!
//! Character definitions come from outside the engine as JSON. A broken
//! entry inside a definition (a malformed modifier, an unknown passive
//! id) costs only that entry: it is skipped with a warning and the rest
//! of the party still makes it into the battle.

use crate::attribute::{names, standard_base};
use crate::combatant::{Combatant, Team};
use crate::error::EngineError;
use crate::modifier::Modifier;
use crate::stat_block::StatBlock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// One combatant as described by a setup document.
///
/// # Examples
///
/// ```rust
/// use zzpassive::config::CombatantSpec;
///
/// let spec: CombatantSpec = serde_json::from_str(r#"{
///     "name": "Ayla",
///     "team": "party",
///     "base": { "atk": 140 },
///     "passives": ["berserker_momentum"],
///     "modifiers": [
///         { "name": "blessing", "source": "shrine", "deltas": { "def": 10 }, "duration": -1 },
///         { "name": "broken", "duration": "soon" }
///     ]
/// }"#).unwrap();
///
/// let ayla = spec.build();
/// assert_eq!(ayla.stats.get("atk"), 140.0);
/// assert_eq!(ayla.stats.get("def"), 60.0);
/// assert_eq!(ayla.stats.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSpec {
    pub name: String,
    pub team: Team,
    /// Overrides on top of the standard base attributes.
    #[serde(default)]
    pub base: BTreeMap<String, f64>,
    /// Starting HP. Full HP when absent.
    #[serde(default)]
    pub hp: Option<f64>,
    /// Passive ids, in attach order.
    #[serde(default)]
    pub passives: Vec<String>,
    /// Starting modifiers, parsed one by one.
    #[serde(default)]
    pub modifiers: Vec<serde_json::Value>,
}

impl CombatantSpec {
    /// Starting modifiers that parse and validate. Others are dropped with
    /// a warning.
    pub fn parsed_modifiers(&self) -> Vec<Modifier> {
        self.modifiers
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| {
                let parsed = serde_json::from_value::<Modifier>(raw.clone())
                    .map_err(EngineError::from)
                    .and_then(|m| m.validate().map(|()| m));
                match parsed {
                    Ok(modifier) => Some(modifier),
                    Err(err) => {
                        warn!(combatant = %self.name, index, error = %err, "skipping modifier");
                        None
                    }
                }
            })
            .collect()
    }

    /// Build the combatant.
    pub fn build(&self) -> Combatant {
        let mut stats = StatBlock::new();
        for (attribute, value) in standard_base() {
            stats.set_base(attribute, value);
        }
        for (attribute, value) in &self.base {
            stats.set_base(attribute.as_str(), *value);
        }
        for modifier in self.parsed_modifiers() {
            stats.add(modifier);
        }

        let mut combatant = Combatant::with_stats(self.name.clone(), self.team, stats);
        if let Some(hp) = self.hp {
            if hp.is_finite() {
                combatant.hp = hp.clamp(0.0, combatant.stats.get(names::MAX_HP));
            } else {
                warn!(combatant = %self.name, "ignoring non-finite starting hp");
            }
        }
        combatant
    }
}

/// A whole battle setup: every combatant, in join order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleSetup {
    pub combatants: Vec<CombatantSpec>,
}

impl BattleSetup {
    /// Parse a setup document.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if the document itself is not valid.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON form of the document.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` if serialization fails.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

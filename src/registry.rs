//! Passive registry module.
//!
//! Maps passive ids to factories. The table is built once, explicitly,
//! and is immutable afterwards; every battle asks it for fresh instances
//! so no passive state is ever shared between battles.

use crate::error::EngineError;
use crate::passive::{self, Passive};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::warn;

/// Creates a fresh passive instance.
pub type PassiveFactory = fn() -> Box<dyn Passive>;

const BUILTIN: &[(&str, PassiveFactory)] = &[
    ("berserker_momentum", passive::berserker_momentum),
    ("iron_resolve", passive::iron_resolve),
    ("tidal_focus", passive::tidal_focus),
    ("lunar_cycle", passive::lunar_cycle),
    ("vampiric_siphon", passive::vampiric_siphon),
    ("guardian_bond", passive::guardian_bond),
    ("mirror_ward", passive::mirror_ward),
    ("echo_strike", passive::echo_strike),
    ("overcharge", passive::overcharge),
    ("stalwart_will", passive::stalwart_will),
    ("purifying_light", passive::purifying_light),
    ("pack_bond", passive::pack_bond),
];

/// Collects factories before freezing them into a [`PassiveRegistry`].
///
/// # Examples
///
/// ```rust
/// use zzpassive::passive;
/// use zzpassive::registry::RegistryBuilder;
///
/// let mut builder = RegistryBuilder::new();
/// builder.register("echo_strike", passive::echo_strike).unwrap();
/// assert!(builder.register("echo_strike", passive::echo_strike).is_err());
///
/// let registry = builder.build();
/// assert!(registry.contains("echo_strike"));
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    factories: BTreeMap<&'static str, PassiveFactory>,
}

impl RegistryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-filled with the built-in catalogue.
    pub fn with_builtin() -> Self {
        Self {
            factories: BUILTIN.iter().copied().collect(),
        }
    }

    /// Register `factory` under `id`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DuplicatePassive` if `id` is already taken.
    pub fn register(
        &mut self,
        id: &'static str,
        factory: PassiveFactory,
    ) -> Result<&mut Self, EngineError> {
        if self.factories.contains_key(id) {
            return Err(EngineError::DuplicatePassive(id.to_string()));
        }
        self.factories.insert(id, factory);
        Ok(self)
    }

    /// Freeze the table into a [`PassiveRegistry`].
    pub fn build(self) -> PassiveRegistry {
        PassiveRegistry {
            factories: self.factories,
        }
    }
}

/// Immutable id → factory table.
///
/// # Examples
///
/// ```rust
/// use zzpassive::registry::PassiveRegistry;
///
/// let registry = PassiveRegistry::builtin();
/// let passive = registry.instantiate("iron_resolve").unwrap();
/// assert_eq!(passive.id(), "iron_resolve");
///
/// // Unknown ids degrade to "no passive".
/// assert!(registry.instantiate("glass_cannon").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PassiveRegistry {
    factories: BTreeMap<&'static str, PassiveFactory>,
}

impl PassiveRegistry {
    /// Fresh registry holding the built-in catalogue.
    pub fn builtin() -> Self {
        RegistryBuilder::with_builtin().build()
    }

    /// Process-wide built-in registry, built on first use.
    pub fn global() -> &'static PassiveRegistry {
        static GLOBAL: OnceLock<PassiveRegistry> = OnceLock::new();
        GLOBAL.get_or_init(PassiveRegistry::builtin)
    }

    /// Factory registered under `id`.
    pub fn resolve(&self, id: &str) -> Option<PassiveFactory> {
        self.factories.get(id).copied()
    }

    /// New instance of `id`, or `None` with a warning if it is unknown.
    pub fn instantiate(&self, id: &str) -> Option<Box<dyn Passive>> {
        match self.resolve(id) {
            Some(factory) => Some(factory()),
            None => {
                warn!(passive = id, "unknown passive id, skipping");
                None
            }
        }
    }

    /// Instances for every known id in `ids`, in order. Unknown ids are
    /// skipped with a warning.
    pub fn instantiate_all<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Box<dyn Passive>> {
        ids.iter()
            .filter_map(|id| self.instantiate(id.as_ref()))
            .collect()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Number of registered passives.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_are_unique() {
        let registry = PassiveRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN.len());
    }

    #[test]
    fn test_factory_ids_match_keys() {
        let registry = PassiveRegistry::builtin();
        for id in registry.ids() {
            let passive = registry.instantiate(id).unwrap();
            assert_eq!(passive.id(), id);
            assert!(!passive.triggers().is_empty());
            assert!(passive.tracked().is_empty());
        }
    }

    #[test]
    fn test_instantiate_all_skips_unknown() {
        let registry = PassiveRegistry::builtin();
        let passives = registry.instantiate_all(&["echo_strike", "nope", "pack_bond"]);
        let ids: Vec<_> = passives.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["echo_strike", "pack_bond"]);
    }

    #[test]
    fn test_global_is_built_once() {
        let a = PassiveRegistry::global();
        let b = PassiveRegistry::global();
        assert!(std::ptr::eq(a, b));
        assert!(a.contains("berserker_momentum"));
    }

    #[test]
    fn test_empty_builder() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(registry.resolve("echo_strike").is_none());
    }
}

//! Stat block module.
//!
//! Provides the `StatBlock` type: base attribute values plus an ordered
//! collection of active modifiers. Effective values are computed on
//! demand, so a read right after a passive mutates the block already
//! sees the change.

use crate::attribute::{default_bounds, AttributeId, Bounds};
use crate::error::EngineError;
use crate::modifier::{Lifetime, Modifier};
use crate::resolved::ResolvedStat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{trace, warn};

/// Base attributes and the modifiers currently active on them.
///
/// Invariants:
/// - at most one modifier per name (re-adding replaces, last write wins);
/// - `get(a) = clamp(base(a) + Σ delta(a))` over the active modifiers;
/// - no held delta or base value is ever non-finite.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{Modifier, StatBlock};
///
/// let mut stats = StatBlock::new().with_base("mitigation", 1.0);
/// stats.add(Modifier::lasting("brace", "shield", 1).with_delta("mitigation", 0.2));
/// stats.add(Modifier::permanent("cracked", "curse").with_delta("mitigation", -0.05));
/// assert!((stats.get("mitigation") - 1.15).abs() < 1e-9);
///
/// stats.tick();
/// assert!((stats.get("mitigation") - 0.95).abs() < 1e-9);
/// ```
///
/// Deserializing rebuilds the block through [`StatBlock::add`], so a
/// document holds the same invariants as a block built in code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RawStatBlock")]
pub struct StatBlock {
    base: HashMap<AttributeId, f64>,
    modifiers: Vec<Modifier>,
    bounds: HashMap<AttributeId, Bounds>,
}

/// Wire form of a [`StatBlock`] before its invariants are restored.
#[derive(Deserialize)]
struct RawStatBlock {
    #[serde(default)]
    base: HashMap<AttributeId, f64>,
    #[serde(default)]
    modifiers: Vec<Modifier>,
    #[serde(default)]
    bounds: HashMap<AttributeId, Bounds>,
}

impl TryFrom<RawStatBlock> for StatBlock {
    type Error = EngineError;

    fn try_from(raw: RawStatBlock) -> Result<Self, Self::Error> {
        let mut block = StatBlock::new();
        for (attribute, value) in raw.base {
            block.set_base(attribute, value);
        }
        for (attribute, bounds) in raw.bounds {
            block.set_bounds(attribute, bounds);
        }
        for modifier in raw.modifiers {
            modifier.validate()?;
            block.add(modifier);
        }
        Ok(block)
    }
}

impl StatBlock {
    /// Create an empty stat block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StatBlock::set_base`].
    pub fn with_base(mut self, attribute: impl Into<AttributeId>, value: f64) -> Self {
        self.set_base(attribute, value);
        self
    }

    /// Builder form of [`StatBlock::set_bounds`].
    pub fn with_bounds(mut self, attribute: impl Into<AttributeId>, bounds: Bounds) -> Self {
        self.set_bounds(attribute, bounds);
        self
    }

    /// Set the base value of an attribute. Non-finite values are ignored.
    pub fn set_base(&mut self, attribute: impl Into<AttributeId>, value: f64) {
        let attribute = attribute.into();
        if !value.is_finite() {
            warn!(%attribute, value, "ignoring non-finite base value");
            return;
        }
        self.base.insert(attribute, value);
    }

    /// Override the clamp rule for one attribute on this block.
    pub fn set_bounds(&mut self, attribute: impl Into<AttributeId>, bounds: Bounds) {
        self.bounds.insert(attribute.into(), bounds);
    }

    /// Base value of an attribute (`0.0` when unset).
    pub fn base(&self, attribute: &str) -> f64 {
        self.base.get(attribute).copied().unwrap_or(0.0)
    }

    /// Clamp rule in effect for an attribute.
    pub fn bounds(&self, attribute: &str) -> Bounds {
        self.bounds
            .get(attribute)
            .copied()
            .unwrap_or_else(|| default_bounds(attribute))
    }

    /// Effective value: base plus every active delta, clamped.
    pub fn get(&self, attribute: &str) -> f64 {
        let sum: f64 = self
            .modifiers
            .iter()
            .filter_map(|m| m.delta(attribute))
            .sum();
        self.bounds(attribute).apply(self.base(attribute) + sum)
    }

    /// Effective value with the full list of contributing modifiers.
    pub fn breakdown(&self, attribute: &str) -> ResolvedStat {
        let mut resolved = ResolvedStat::new(
            AttributeId::from_str(attribute),
            self.base(attribute),
            self.bounds(attribute),
        );
        for modifier in &self.modifiers {
            if let Some(delta) = modifier.delta(attribute) {
                resolved.add_contribution(modifier.name(), delta);
            }
        }
        resolved
    }

    /// Insert a modifier, replacing any modifier with the same name.
    ///
    /// A replaced modifier keeps its position. Non-finite deltas are
    /// dropped with a warning, and a modifier whose lifetime is already
    /// expired only removes its namesake. Returns the replaced modifier.
    pub fn add(&mut self, mut modifier: Modifier) -> Option<Modifier> {
        for attribute in modifier.sanitize() {
            warn!(
                modifier = modifier.name(),
                %attribute,
                "dropping non-finite modifier delta"
            );
        }
        let existing = self
            .modifiers
            .iter()
            .position(|m| m.name() == modifier.name());

        if modifier.lifetime().is_expired() {
            return existing.map(|idx| self.modifiers.remove(idx));
        }

        match existing {
            Some(idx) => Some(std::mem::replace(&mut self.modifiers[idx], modifier)),
            None => {
                self.modifiers.push(modifier);
                None
            }
        }
    }

    /// Remove the modifier with this name. Returns whether one was removed.
    pub fn remove_by_name(&mut self, name: &str) -> bool {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.name() != name);
        before != self.modifiers.len()
    }

    /// Remove every modifier from this source. Returns how many were removed.
    pub fn remove_by_source(&mut self, source: &str) -> usize {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.source() != source);
        before - self.modifiers.len()
    }

    /// Advance every timed modifier by one tick, dropping the expired ones.
    ///
    /// Called by the battle driver once per owner turn end. Returns the
    /// names of the modifiers that expired.
    pub fn tick(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.modifiers.retain_mut(|m| {
            m.tick();
            if m.lifetime().is_expired() {
                expired.push(m.name().to_string());
                false
            } else {
                true
            }
        });
        if !expired.is_empty() {
            trace!(?expired, "modifiers expired");
        }
        expired
    }

    /// Detached copy of the active modifiers, in stat block order.
    pub fn snapshot(&self) -> Vec<Modifier> {
        self.modifiers.clone()
    }

    /// Borrow a modifier by name.
    pub fn modifier(&self, name: &str) -> Option<&Modifier> {
        self.modifiers.iter().find(|m| m.name() == name)
    }

    /// Whether a modifier with this name is active.
    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifier(name).is_some()
    }

    /// Number of modifiers from this source.
    pub fn count_from(&self, source: &str) -> usize {
        self.modifiers.iter().filter(|m| m.source() == source).count()
    }

    /// Number of active modifiers.
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    /// Whether no modifier is active.
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Remaining lifetime of a modifier, if active.
    pub fn lifetime_of(&self, name: &str) -> Option<Lifetime> {
        self.modifier(name).map(Modifier::lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::names;

    #[test]
    fn test_get_sums_base_and_deltas() {
        let mut stats = StatBlock::new().with_base(names::ATTACK, 100.0);
        stats.add(Modifier::permanent("a", "x").with_delta(names::ATTACK, 10.0));
        stats.add(Modifier::lasting("b", "y", 2).with_delta(names::ATTACK, -5.0));
        assert_eq!(stats.get(names::ATTACK), 105.0);
    }

    #[test]
    fn test_missing_attribute_is_zero() {
        let stats = StatBlock::new();
        assert_eq!(stats.get("luck"), 0.0);
    }

    #[test]
    fn test_add_replaces_by_name_in_place() {
        let mut stats = StatBlock::new();
        stats.add(Modifier::permanent("first", "x").with_delta("atk", 1.0));
        stats.add(Modifier::permanent("dup", "x").with_delta("atk", 2.0));
        stats.add(Modifier::permanent("last", "x").with_delta("atk", 3.0));
        let replaced = stats.add(Modifier::lasting("dup", "z", 4).with_delta("atk", 20.0));

        assert_eq!(replaced.map(|m| m.delta("atk")), Some(Some(2.0)));
        let names: Vec<_> = stats.snapshot().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["first", "dup", "last"]);
        assert_eq!(stats.get("atk"), 24.0);
    }

    #[test]
    fn test_add_expired_removes_namesake() {
        let mut stats = StatBlock::new();
        stats.add(Modifier::permanent("ward", "x").with_delta("def", 5.0));
        stats.add(Modifier::lasting("ward", "x", 0));
        assert!(stats.is_empty());
        assert!(stats.add(Modifier::lasting("ghost", "x", 0)).is_none());
        assert!(stats.is_empty());
    }

    #[test]
    fn test_add_drops_non_finite_delta() {
        let mut stats = StatBlock::new().with_base("atk", 10.0);
        stats.add(
            Modifier::permanent("bad", "x")
                .with_delta("atk", f64::NAN)
                .with_delta("def", 3.0),
        );
        assert_eq!(stats.get("atk"), 10.0);
        assert_eq!(stats.get("def"), 3.0);
    }

    #[test]
    fn test_set_base_ignores_non_finite() {
        let mut stats = StatBlock::new().with_base("atk", 10.0);
        stats.set_base("atk", f64::INFINITY);
        assert_eq!(stats.base("atk"), 10.0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut stats = StatBlock::new();
        stats.add(Modifier::permanent("a", "src").with_delta("atk", 1.0));
        stats.add(Modifier::permanent("b", "src").with_delta("atk", 1.0));
        stats.add(Modifier::permanent("c", "other").with_delta("atk", 1.0));

        assert!(stats.remove_by_name("c"));
        assert!(!stats.remove_by_name("c"));
        assert_eq!(stats.remove_by_source("src"), 2);
        assert_eq!(stats.remove_by_source("src"), 0);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_tick_expires_exactly_after_duration() {
        let mut stats = StatBlock::new();
        stats.add(Modifier::lasting("short", "x", 2).with_delta("spd", 1.0));
        stats.add(Modifier::permanent("forever", "x").with_delta("spd", 1.0));

        assert!(stats.tick().is_empty());
        assert_eq!(stats.lifetime_of("short"), Some(Lifetime::Turns(1)));
        assert_eq!(stats.tick(), vec!["short".to_string()]);
        assert!(!stats.has_modifier("short"));

        for _ in 0..50 {
            stats.tick();
        }
        assert!(stats.has_modifier("forever"));
    }

    #[test]
    fn test_clamps_use_default_table() {
        let mut stats = StatBlock::new().with_base(names::CRIT_RATE, 0.8);
        stats.add(Modifier::permanent("a", "x").with_delta(names::CRIT_RATE, 0.5));
        assert_eq!(stats.get(names::CRIT_RATE), 1.0);

        let mut stats = StatBlock::new().with_base(names::MITIGATION, 1.0);
        stats.add(Modifier::permanent("a", "x").with_delta(names::MITIGATION, -5.0));
        assert_eq!(stats.get(names::MITIGATION), crate::attribute::MIN_MITIGATION);
    }

    #[test]
    fn test_bounds_override() {
        let mut stats = StatBlock::new()
            .with_base("rage", 90.0)
            .with_bounds("rage", Bounds::new(Some(0.0), Some(100.0)));
        stats.add(Modifier::permanent("fury", "x").with_delta("rage", 50.0));
        assert_eq!(stats.get("rage"), 100.0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut stats = StatBlock::new();
        stats.add(Modifier::permanent("a", "x").with_delta("atk", 1.0));
        let mut snap = stats.snapshot();
        snap.clear();
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_count_from() {
        let mut stats = StatBlock::new();
        stats.add(Modifier::permanent("a", "x"));
        stats.add(Modifier::permanent("b", "x"));
        stats.add(Modifier::permanent("c", "y"));
        assert_eq!(stats.count_from("x"), 2);
        assert_eq!(stats.count_from("z"), 0);
    }
}

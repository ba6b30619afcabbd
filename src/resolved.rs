//! Resolved attribute breakdown module.
//!
//! Contains the `ResolvedStat` type: an attribute's effective value
//! together with everything that contributed to it. Tooltips and debug
//! views read this; nothing in the engine depends on it.

use crate::attribute::{AttributeId, Bounds};
use serde::{Deserialize, Serialize};

/// An effective attribute value with full breakdown information.
///
/// This is read-only and detached from the stat block it came from.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{Lifetime, Modifier, StatBlock};
///
/// let mut stats = StatBlock::new().with_base("crit_rate", 0.9);
/// stats.add(Modifier::new("focus", "scope", Lifetime::Turns(2)).with_delta("crit_rate", 0.3));
///
/// let resolved = stats.breakdown("crit_rate");
/// assert_eq!(resolved.base, 0.9);
/// assert_eq!(resolved.contributions.len(), 1);
/// assert!((resolved.unclamped - 1.2).abs() < 1e-9);
/// assert_eq!(resolved.value, 1.0);
/// assert!(resolved.is_clamped());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedStat {
    /// The attribute identifier.
    pub attribute: AttributeId,

    /// Base value before any modifier.
    pub base: f64,

    /// Each contributing modifier as `(modifier_name, delta)`, in the
    /// order the modifiers sit on the stat block.
    pub contributions: Vec<(String, f64)>,

    /// Base plus every delta, before clamping.
    pub unclamped: f64,

    /// Bounds that were applied.
    pub bounds: Bounds,

    /// The effective value.
    pub value: f64,
}

impl ResolvedStat {
    /// Start a breakdown from a base value.
    pub fn new(attribute: AttributeId, base: f64, bounds: Bounds) -> Self {
        Self {
            attribute,
            base,
            contributions: Vec::new(),
            unclamped: base,
            bounds,
            value: bounds.apply(base),
        }
    }

    /// Record one modifier's delta and update the totals.
    pub fn add_contribution(&mut self, name: impl Into<String>, delta: f64) {
        self.contributions.push((name.into(), delta));
        self.unclamped += delta;
        self.value = self.bounds.apply(self.unclamped);
    }

    /// Whether the bounds changed the value.
    pub fn is_clamped(&self) -> bool {
        self.value != self.unclamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_stat_creation() {
        let stat = ResolvedStat::new(AttributeId::from_str("atk"), 150.0, Bounds::NON_NEGATIVE);
        assert_eq!(stat.attribute.as_str(), "atk");
        assert_eq!(stat.value, 150.0);
        assert!(stat.contributions.is_empty());
        assert!(!stat.is_clamped());
    }

    #[test]
    fn test_resolved_stat_contributions_in_order() {
        let mut stat = ResolvedStat::new(AttributeId::from_str("def"), 50.0, Bounds::NON_NEGATIVE);
        stat.add_contribution("guard", 20.0);
        stat.add_contribution("sunder", -100.0);

        assert_eq!(stat.contributions[0].0, "guard");
        assert_eq!(stat.contributions[1].0, "sunder");
        assert_eq!(stat.unclamped, -30.0);
        assert_eq!(stat.value, 0.0);
        assert!(stat.is_clamped());
    }

    #[test]
    fn test_resolved_stat_serializes() {
        let mut stat = ResolvedStat::new(AttributeId::from_str("spd"), 100.0, Bounds::UNBOUNDED);
        stat.add_contribution("haste", 10.0);
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["attribute"], "spd");
        assert_eq!(json["value"], 110.0);
    }
}

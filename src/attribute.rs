//! Attribute identifier module.
//!
//! Provides the `AttributeId` type, an interned string identifier for
//! combat attributes, and the per-attribute clamp table (`Bounds`) that
//! keeps effective values inside their legal range no matter how many
//! modifiers stack on top of each other.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::sync::Arc;

/// Well-known attribute names.
///
/// The engine is not limited to these; any string works as an attribute.
/// These are the ones with documented clamp rules (see [`default_bounds`]).
pub mod names {
    /// Attack power.
    pub const ATTACK: &str = "atk";
    /// Flat defense.
    pub const DEFENSE: &str = "def";
    /// Maximum hit points.
    pub const MAX_HP: &str = "max_hp";
    /// Critical hit chance, `[0, 1]`.
    pub const CRIT_RATE: &str = "crit_rate";
    /// Critical damage multiplier, never below `1.0`.
    pub const CRIT_DAMAGE: &str = "crit_damage";
    /// Incoming damage divisor. Higher is tankier.
    pub const MITIGATION: &str = "mitigation";
    /// Dodge chance, `[0, 1]`.
    pub const DODGE_ODDS: &str = "dodge_odds";
    /// Chance modifier for applying effects.
    pub const EFFECT_HIT_RATE: &str = "effect_hit_rate";
    /// Resistance against incoming effects.
    pub const EFFECT_RESISTANCE: &str = "effect_resistance";
    /// Healing multiplier.
    pub const VITALITY: &str = "vitality";
    /// Turn speed.
    pub const SPEED: &str = "spd";
}

/// Lowest multiplier `mitigation` may reach.
pub const MIN_MITIGATION: f64 = 0.1;

/// Lowest multiplier `vitality` may reach.
pub const MIN_VITALITY: f64 = 0.01;

/// Interned string identifier for attributes.
///
/// Uses `Arc<str>` for cheap clones and fast comparison. Implements
/// `Borrow<str>` so maps keyed by `AttributeId` can be queried with a
/// plain `&str`.
///
/// # Examples
///
/// ```rust
/// use zzpassive::AttributeId;
///
/// let atk = AttributeId::from_str("atk");
/// let atk2: AttributeId = "atk".into();
/// let atk3: AttributeId = String::from("atk").into();
///
/// assert_eq!(atk, atk2);
/// assert_eq!(atk, atk3);
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributeId(Arc<str>);

impl Serialize for AttributeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AttributeId::from(s))
    }
}

impl AttributeId {
    /// Create a new `AttributeId` from a string slice.
    pub fn from_str(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the string representation of this `AttributeId`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttributeId {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for AttributeId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Borrow<str> for AttributeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AttributeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Legal range of an attribute's effective value.
///
/// `None` on either side means unbounded in that direction.
///
/// # Examples
///
/// ```rust
/// use zzpassive::Bounds;
///
/// let unit = Bounds::UNIT;
/// assert_eq!(unit.apply(1.4), 1.0);
/// assert_eq!(unit.apply(-0.2), 0.0);
/// assert_eq!(Bounds::floor(0.1).apply(0.05), 0.1);
/// assert_eq!(Bounds::UNBOUNDED.apply(-7.0), -7.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Inclusive lower bound.
    #[serde(default)]
    pub min: Option<f64>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub max: Option<f64>,
}

impl Bounds {
    /// No clamping at all.
    pub const UNBOUNDED: Bounds = Bounds {
        min: None,
        max: None,
    };

    /// Probability-like range `[0, 1]`.
    pub const UNIT: Bounds = Bounds {
        min: Some(0.0),
        max: Some(1.0),
    };

    /// Never negative.
    pub const NON_NEGATIVE: Bounds = Bounds {
        min: Some(0.0),
        max: None,
    };

    /// Create bounds with both ends optional.
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Only a lower bound.
    pub const fn floor(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Only an upper bound.
    pub const fn ceiling(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Clamp `value` into these bounds.
    ///
    /// A NaN input collapses to the lower bound (or `0.0` when there is
    /// none) so invalid states never reach a damage formula.
    pub fn apply(self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min.unwrap_or(0.0);
        }
        let mut value = value;
        if let Some(min) = self.min {
            value = value.max(min);
        }
        if let Some(max) = self.max {
            value = value.min(max);
        }
        value
    }
}

/// Clamp rule for a well-known attribute.
///
/// Unknown attributes are unbounded.
///
/// # Examples
///
/// ```rust
/// use zzpassive::attribute::{default_bounds, names};
/// use zzpassive::Bounds;
///
/// assert_eq!(default_bounds(names::CRIT_RATE), Bounds::UNIT);
/// assert_eq!(default_bounds("luck"), Bounds::UNBOUNDED);
/// ```
pub fn default_bounds(attribute: &str) -> Bounds {
    match attribute {
        names::CRIT_RATE | names::DODGE_ODDS => Bounds::UNIT,
        names::MITIGATION => Bounds::floor(MIN_MITIGATION),
        names::VITALITY => Bounds::floor(MIN_VITALITY),
        names::CRIT_DAMAGE => Bounds::floor(1.0),
        names::MAX_HP => Bounds::floor(1.0),
        names::ATTACK
        | names::DEFENSE
        | names::SPEED
        | names::EFFECT_HIT_RATE
        | names::EFFECT_RESISTANCE => Bounds::NON_NEGATIVE,
        _ => Bounds::UNBOUNDED,
    }
}

/// Base values every combatant starts from unless configured otherwise.
pub fn standard_base() -> Vec<(AttributeId, f64)> {
    vec![
        (names::ATTACK.into(), 100.0),
        (names::DEFENSE.into(), 50.0),
        (names::MAX_HP.into(), 1000.0),
        (names::CRIT_RATE.into(), 0.05),
        (names::CRIT_DAMAGE.into(), 2.0),
        (names::MITIGATION.into(), 1.0),
        (names::DODGE_ODDS.into(), 0.05),
        (names::EFFECT_HIT_RATE.into(), 1.0),
        (names::EFFECT_RESISTANCE.into(), 0.05),
        (names::VITALITY.into(), 1.0),
        (names::SPEED.into(), 100.0),
    ]
}

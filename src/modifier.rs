//! Modifiers module.
//!
//! A `Modifier` is an immutable record: a name unique on its holder, the
//! id of whatever put it there, a set of attribute deltas and a lifetime
//! in ticks. Modifiers never read each other; a stat block simply sums
//! their deltas on top of the base value.

use crate::attribute::AttributeId;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How long a modifier stays on its holder.
///
/// Serialized as a signed integer: `-1` (or any negative number) is
/// [`Lifetime::Permanent`], `n >= 0` is `n` ticks remaining. `0` means the
/// modifier has already expired.
///
/// # Examples
///
/// ```rust
/// use zzpassive::Lifetime;
///
/// assert_eq!(Lifetime::from(-1), Lifetime::Permanent);
/// assert_eq!(Lifetime::from(3), Lifetime::Turns(3));
/// assert_eq!(i32::from(Lifetime::Permanent), -1);
/// assert!(Lifetime::Turns(0).is_expired());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Lifetime {
    /// Lives until removed by name or source.
    Permanent,
    /// Ticks remaining.
    Turns(u32),
}

impl Lifetime {
    /// Whether the modifier should already be gone.
    pub fn is_expired(self) -> bool {
        matches!(self, Lifetime::Turns(0))
    }

    /// Ticks remaining, `None` for permanent modifiers.
    pub fn remaining(self) -> Option<u32> {
        match self {
            Lifetime::Permanent => None,
            Lifetime::Turns(n) => Some(n),
        }
    }

    /// The lifetime after one tick.
    pub fn ticked(self) -> Self {
        match self {
            Lifetime::Permanent => Lifetime::Permanent,
            Lifetime::Turns(n) => Lifetime::Turns(n.saturating_sub(1)),
        }
    }
}

impl From<i32> for Lifetime {
    fn from(value: i32) -> Self {
        if value < 0 {
            Lifetime::Permanent
        } else {
            Lifetime::Turns(value as u32)
        }
    }
}

impl From<Lifetime> for i32 {
    fn from(value: Lifetime) -> Self {
        match value {
            Lifetime::Permanent => -1,
            Lifetime::Turns(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }
}

/// A named, sourced, time-limited set of attribute deltas.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{Lifetime, Modifier};
///
/// let rally = Modifier::new("rally", "banner", Lifetime::Turns(2))
///     .with_delta("atk", 25.0)
///     .with_delta("spd", 5.0);
///
/// assert_eq!(rally.name(), "rally");
/// assert_eq!(rally.source(), "banner");
/// assert_eq!(rally.delta("atk"), Some(25.0));
/// assert_eq!(rally.delta("def"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    name: String,
    source: String,
    #[serde(default)]
    deltas: BTreeMap<AttributeId, f64>,
    #[serde(rename = "duration")]
    lifetime: Lifetime,
}

impl Modifier {
    /// Create a modifier with no deltas yet.
    pub fn new(name: impl Into<String>, source: impl Into<String>, lifetime: Lifetime) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            deltas: BTreeMap::new(),
            lifetime,
        }
    }

    /// Create a modifier that lives until explicitly removed.
    pub fn permanent(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, source, Lifetime::Permanent)
    }

    /// Create a modifier that expires after `turns` ticks.
    pub fn lasting(name: impl Into<String>, source: impl Into<String>, turns: u32) -> Self {
        Self::new(name, source, Lifetime::Turns(turns))
    }

    /// Add (or replace) the delta for one attribute.
    pub fn with_delta(mut self, attribute: impl Into<AttributeId>, delta: f64) -> Self {
        self.deltas.insert(attribute.into(), delta);
        self
    }

    /// Unique name on the holder.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of whatever applied this modifier.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Remaining lifetime.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Delta for `attribute`, if this modifier defines one.
    pub fn delta(&self, attribute: &str) -> Option<f64> {
        self.deltas.get(attribute).copied()
    }

    /// All deltas in attribute order.
    pub fn deltas(&self) -> impl Iterator<Item = (&AttributeId, f64)> {
        self.deltas.iter().map(|(id, delta)| (id, *delta))
    }

    /// Check that the modifier can be held by a stat block.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.is_empty() {
            return Err(EngineError::InvalidModifier {
                name: self.name.clone(),
                reason: "name is empty".into(),
            });
        }
        if let Some((attribute, _)) = self.deltas.iter().find(|(_, d)| !d.is_finite()) {
            return Err(EngineError::InvalidModifier {
                name: self.name.clone(),
                reason: format!("delta for {attribute} is not finite"),
            });
        }
        Ok(())
    }

    /// Drop every non-finite delta, returning the attributes removed.
    pub(crate) fn sanitize(&mut self) -> Vec<AttributeId> {
        let bad: Vec<AttributeId> = self
            .deltas
            .iter()
            .filter(|(_, d)| !d.is_finite())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &bad {
            self.deltas.remove(id);
        }
        bad
    }

    pub(crate) fn tick(&mut self) {
        self.lifetime = self.lifetime.ticked();
    }
}

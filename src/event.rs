//! Combat lifecycle events.
//!
//! The vocabulary is closed: [`BattleEvent`] is a tagged union with one
//! variant per lifecycle event, and passives match on it exhaustively so
//! adding an event is a compile error everywhere it is not handled.
//! [`EventKind`] is the payload-free tag used as a subscription key.

use crate::combatant::{CombatantHandle, Team};
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Payload-free event tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BattleStart,
    TurnStart,
    TurnEnd,
    ActionTaken,
    HitLanded,
    CriticalHit,
    DotTick,
    EffectApplied,
    EffectResisted,
    DotCleansed,
    SummonRemoved,
    UltimateUsed,
    BattleEnd,
}

impl EventKind {
    /// Every event kind, in lifecycle order.
    pub const ALL: [EventKind; 13] = [
        EventKind::BattleStart,
        EventKind::TurnStart,
        EventKind::TurnEnd,
        EventKind::ActionTaken,
        EventKind::HitLanded,
        EventKind::CriticalHit,
        EventKind::DotTick,
        EventKind::EffectApplied,
        EventKind::EffectResisted,
        EventKind::DotCleansed,
        EventKind::SummonRemoved,
        EventKind::UltimateUsed,
        EventKind::BattleEnd,
    ];

    /// Wire name of the event.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::BattleStart => "battle_start",
            EventKind::TurnStart => "turn_start",
            EventKind::TurnEnd => "turn_end",
            EventKind::ActionTaken => "action_taken",
            EventKind::HitLanded => "hit_landed",
            EventKind::CriticalHit => "critical_hit",
            EventKind::DotTick => "dot_tick",
            EventKind::EffectApplied => "effect_applied",
            EventKind::EffectResisted => "effect_resisted",
            EventKind::DotCleansed => "dot_cleansed",
            EventKind::SummonRemoved => "summon_removed",
            EventKind::UltimateUsed => "ultimate_used",
            EventKind::BattleEnd => "battle_end",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event name: {s}"))
    }
}

/// Compact set of event kinds.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{EventKind, TriggerSet};
///
/// let set = TriggerSet::of(&[EventKind::HitLanded, EventKind::BattleEnd]);
/// assert!(set.contains(EventKind::HitLanded));
/// assert!(!set.contains(EventKind::TurnEnd));
/// assert_eq!(set.iter().count(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerSet(u16);

impl TriggerSet {
    /// The empty set.
    pub const EMPTY: TriggerSet = TriggerSet(0);

    /// Set containing exactly `kinds`.
    pub fn of(kinds: &[EventKind]) -> Self {
        let mut set = Self::EMPTY;
        for kind in kinds {
            set.insert(*kind);
        }
        set
    }

    pub fn insert(&mut self, kind: EventKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: EventKind) {
        self.0 &= !kind.bit();
    }

    pub fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Union of two sets.
    pub fn with(self, other: TriggerSet) -> Self {
        TriggerSet(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in lifecycle order.
    pub fn iter(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

/// A combat lifecycle event with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    /// The battle begins. Emitted once, before the first turn.
    BattleStart,
    /// `actor` begins its turn.
    TurnStart { actor: CombatantHandle },
    /// `actor` finishes its turn; modifiers tick right after.
    TurnEnd { actor: CombatantHandle },
    /// `actor` performs the named action.
    ActionTaken {
        actor: CombatantHandle,
        action: String,
    },
    /// Damage from `attacker` landed on `target`.
    HitLanded {
        attacker: CombatantHandle,
        target: CombatantHandle,
        amount: f64,
        action: String,
    },
    /// The hit that just landed was critical.
    CriticalHit {
        attacker: CombatantHandle,
        target: CombatantHandle,
        amount: f64,
    },
    /// A damage-over-time effect ticked on `target`.
    DotTick {
        target: CombatantHandle,
        source: Option<CombatantHandle>,
        effect: String,
        amount: f64,
    },
    /// An effect was applied to `target`.
    EffectApplied {
        target: CombatantHandle,
        source: Option<CombatantHandle>,
        effect: String,
    },
    /// `target` resisted an effect.
    EffectResisted {
        target: CombatantHandle,
        source: Option<CombatantHandle>,
        effect: String,
    },
    /// A damage-over-time effect was removed from `target`.
    DotCleansed {
        target: CombatantHandle,
        cleanser: Option<CombatantHandle>,
        effect: String,
    },
    /// A summon left the battle.
    SummonRemoved {
        summon: CombatantHandle,
        summoner: CombatantHandle,
    },
    /// `actor` used its ultimate.
    UltimateUsed { actor: CombatantHandle },
    /// The battle is over.
    BattleEnd { winner: Option<Team> },
}

impl BattleEvent {
    /// Subscription key.
    pub fn kind(&self) -> EventKind {
        match self {
            BattleEvent::BattleStart => EventKind::BattleStart,
            BattleEvent::TurnStart { .. } => EventKind::TurnStart,
            BattleEvent::TurnEnd { .. } => EventKind::TurnEnd,
            BattleEvent::ActionTaken { .. } => EventKind::ActionTaken,
            BattleEvent::HitLanded { .. } => EventKind::HitLanded,
            BattleEvent::CriticalHit { .. } => EventKind::CriticalHit,
            BattleEvent::DotTick { .. } => EventKind::DotTick,
            BattleEvent::EffectApplied { .. } => EventKind::EffectApplied,
            BattleEvent::EffectResisted { .. } => EventKind::EffectResisted,
            BattleEvent::DotCleansed { .. } => EventKind::DotCleansed,
            BattleEvent::SummonRemoved { .. } => EventKind::SummonRemoved,
            BattleEvent::UltimateUsed { .. } => EventKind::UltimateUsed,
            BattleEvent::BattleEnd { .. } => EventKind::BattleEnd,
        }
    }

    /// The combatant acting in this event, if any.
    pub fn actor(&self) -> Option<CombatantHandle> {
        match self {
            BattleEvent::TurnStart { actor }
            | BattleEvent::TurnEnd { actor }
            | BattleEvent::ActionTaken { actor, .. }
            | BattleEvent::UltimateUsed { actor } => Some(*actor),
            BattleEvent::HitLanded { attacker, .. } | BattleEvent::CriticalHit { attacker, .. } => {
                Some(*attacker)
            }
            BattleEvent::DotTick { source, .. }
            | BattleEvent::EffectApplied { source, .. }
            | BattleEvent::EffectResisted { source, .. } => *source,
            BattleEvent::DotCleansed { cleanser, .. } => *cleanser,
            BattleEvent::SummonRemoved { summoner, .. } => Some(*summoner),
            BattleEvent::BattleStart | BattleEvent::BattleEnd { .. } => None,
        }
    }

    /// The combatant on the receiving end, if any.
    pub fn target(&self) -> Option<CombatantHandle> {
        match self {
            BattleEvent::HitLanded { target, .. }
            | BattleEvent::CriticalHit { target, .. }
            | BattleEvent::DotTick { target, .. }
            | BattleEvent::EffectApplied { target, .. }
            | BattleEvent::EffectResisted { target, .. }
            | BattleEvent::DotCleansed { target, .. } => Some(*target),
            BattleEvent::SummonRemoved { summon, .. } => Some(*summon),
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => None,
        }
    }

    /// Numeric amount carried by the event, if any.
    pub fn amount(&self) -> Option<f64> {
        match self {
            BattleEvent::HitLanded { amount, .. }
            | BattleEvent::CriticalHit { amount, .. }
            | BattleEvent::DotTick { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

/// An event plus driver-supplied metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub event: BattleEvent,
    pub metadata: Metadata,
}

impl EventPayload {
    pub fn new(event: BattleEvent) -> Self {
        Self {
            event,
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.metadata.set(key, value);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

impl From<BattleEvent> for EventPayload {
    fn from(event: BattleEvent) -> Self {
        Self::new(event)
    }
}

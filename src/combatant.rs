//! Combatants and the per-battle arena that owns them.
//!
//! Passives never hold a combatant directly. They hold a
//! [`CombatantHandle`], a generation-checked index into the battle's
//! [`Roster`]. A handle never keeps its combatant alive and must be
//! resolved again before each use: once the combatant leaves, the handle
//! resolves to nothing, even if its slot is later reused.

use crate::attribute::{names, standard_base};
use crate::effects::HealKind;
use crate::stat_block::StatBlock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lookup-only reference to a combatant in one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantHandle {
    index: u32,
    generation: u32,
}

impl CombatantHandle {
    /// Slot index inside the roster.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for CombatantHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Side a combatant fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Party,
    Foes,
}

impl Team {
    /// The other side.
    pub fn opposing(self) -> Team {
        match self {
            Team::Party => Team::Foes,
            Team::Foes => Team::Party,
        }
    }
}

/// One participant in a battle.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{Combatant, Team};
///
/// let hero = Combatant::new("Ayla", Team::Party);
/// assert_eq!(hero.hp, hero.max_hp());
/// assert!(hero.is_alive());
/// ```
#[derive(Debug, Clone)]
pub struct Combatant {
    /// Display name.
    pub name: String,
    /// Side.
    pub team: Team,
    /// Attributes and active modifiers.
    pub stats: StatBlock,
    /// Current hit points.
    pub hp: f64,
    /// Charge toward the ultimate, `0..=MAX_ULTIMATE_CHARGE`.
    pub ultimate_charge: u32,
    /// Summoner, when this combatant is a summon.
    pub summoner: Option<CombatantHandle>,
    heal_guards: BTreeMap<String, HealKind>,
}

impl Combatant {
    /// Ultimate charge ceiling.
    pub const MAX_ULTIMATE_CHARGE: u32 = 100;

    /// Create a combatant with the standard base attributes at full HP.
    pub fn new(name: impl Into<String>, team: Team) -> Self {
        let mut stats = StatBlock::new();
        for (attribute, value) in standard_base() {
            stats.set_base(attribute, value);
        }
        Self::with_stats(name, team, stats)
    }

    /// Create a combatant from an existing stat block at full HP.
    pub fn with_stats(name: impl Into<String>, team: Team, stats: StatBlock) -> Self {
        let hp = stats.get(names::MAX_HP);
        Self {
            name: name.into(),
            team,
            stats,
            hp,
            ultimate_charge: 0,
            summoner: None,
            heal_guards: BTreeMap::new(),
        }
    }

    /// Mark this combatant as summoned by `summoner`.
    pub fn summoned_by(mut self, summoner: CombatantHandle) -> Self {
        self.summoner = Some(summoner);
        self
    }

    /// Effective maximum HP.
    pub fn max_hp(&self) -> f64 {
        self.stats.get(names::MAX_HP)
    }

    /// Whether HP is above zero.
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Install a guard named `name` that refuses healing of `kind`.
    pub fn block_healing(&mut self, name: impl Into<String>, kind: HealKind) {
        self.heal_guards.insert(name.into(), kind);
    }

    /// Remove a heal guard. Returns whether one was installed.
    pub fn unblock_healing(&mut self, name: &str) -> bool {
        self.heal_guards.remove(name).is_some()
    }

    /// Whether healing of `kind` is currently accepted.
    pub fn accepts_healing(&self, kind: HealKind) -> bool {
        !self.heal_guards.values().any(|blocked| *blocked == kind)
    }

    /// Number of installed heal guards.
    pub fn heal_guard_count(&self) -> usize {
        self.heal_guards.len()
    }

    /// Drop every heal guard.
    pub fn clear_heal_guards(&mut self) {
        self.heal_guards.clear();
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    occupant: Option<Combatant>,
}

/// Generation-checked arena of the combatants in one battle.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{Combatant, Roster, Team};
///
/// let mut roster = Roster::new();
/// let a = roster.insert(Combatant::new("a", Team::Party));
/// roster.remove(a);
/// let b = roster.insert(Combatant::new("b", Team::Party));
///
/// // Same slot, new generation: the old handle stays dead.
/// assert_eq!(a.index(), b.index());
/// assert!(roster.get(a).is_none());
/// assert_eq!(roster.get(b).map(|c| c.name.as_str()), Some("b"));
/// ```
#[derive(Debug, Default)]
pub struct Roster {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a combatant and issue its handle.
    pub fn insert(&mut self, combatant: Combatant) -> CombatantHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.occupant = Some(combatant);
            return CombatantHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            occupant: Some(combatant),
        });
        CombatantHandle {
            index,
            generation: 0,
        }
    }

    /// Remove a combatant. Stale handles are a no-op.
    pub fn remove(&mut self, handle: CombatantHandle) -> Option<Combatant> {
        let slot = self.slot_mut(handle)?;
        let combatant = slot.occupant.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        combatant
    }

    /// Resolve a handle.
    pub fn get(&self, handle: CombatantHandle) -> Option<&Combatant> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.occupant.as_ref())
    }

    /// Resolve a handle mutably.
    pub fn get_mut(&mut self, handle: CombatantHandle) -> Option<&mut Combatant> {
        self.slot_mut(handle).and_then(|slot| slot.occupant.as_mut())
    }

    /// Whether the handle still resolves.
    pub fn contains(&self, handle: CombatantHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Live handles in slot order.
    pub fn handles(&self) -> Vec<CombatantHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Live combatants with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (CombatantHandle, &Combatant)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.occupant.as_ref().map(|c| {
                (
                    CombatantHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    c,
                )
            })
        })
    }

    /// Living teammates of `handle`, excluding itself.
    pub fn allies_of(&self, handle: CombatantHandle) -> Vec<CombatantHandle> {
        let Some(team) = self.get(handle).map(|c| c.team) else {
            return Vec::new();
        };
        self.iter()
            .filter(|(h, c)| *h != handle && c.team == team && c.is_alive())
            .map(|(h, _)| h)
            .collect()
    }

    /// Living opponents of `handle`.
    pub fn foes_of(&self, handle: CombatantHandle) -> Vec<CombatantHandle> {
        let Some(team) = self.get(handle).map(|c| c.team) else {
            return Vec::new();
        };
        self.iter()
            .filter(|(_, c)| c.team == team.opposing() && c.is_alive())
            .map(|(h, _)| h)
            .collect()
    }

    /// Number of combatants present.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.occupant.is_some()).count()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_mut(&mut self, handle: CombatantHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.occupant.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_combatant_starts_full() {
        let c = Combatant::new("x", Team::Foes);
        assert_eq!(c.hp, 1000.0);
        assert_eq!(c.ultimate_charge, 0);
        assert!(c.summoner.is_none());
    }

    #[test]
    fn test_heal_guards() {
        let mut c = Combatant::new("x", Team::Party);
        c.block_healing("resolve", HealKind::OverTime);
        assert!(!c.accepts_healing(HealKind::OverTime));
        assert!(c.accepts_healing(HealKind::Direct));
        assert!(c.unblock_healing("resolve"));
        assert!(!c.unblock_healing("resolve"));
        assert!(c.accepts_healing(HealKind::OverTime));
    }

    #[test]
    fn test_remove_twice_is_noop() {
        let mut roster = Roster::new();
        let h = roster.insert(Combatant::new("a", Team::Party));
        assert!(roster.remove(h).is_some());
        assert!(roster.remove(h).is_none());
        assert_eq!(roster.len(), 0);
        // The freed slot is only handed out once.
        let a = roster.insert(Combatant::new("b", Team::Party));
        let b = roster.insert(Combatant::new("c", Team::Party));
        assert_ne!(a.index(), b.index());
    }

    #[test]
    fn test_allies_and_foes() {
        let mut roster = Roster::new();
        let a = roster.insert(Combatant::new("a", Team::Party));
        let b = roster.insert(Combatant::new("b", Team::Party));
        let x = roster.insert(Combatant::new("x", Team::Foes));
        let mut dead = Combatant::new("y", Team::Foes);
        dead.hp = 0.0;
        roster.insert(dead);

        assert_eq!(roster.allies_of(a), vec![b]);
        assert_eq!(roster.foes_of(a), vec![x]);
        assert_eq!(roster.foes_of(x), vec![a, b]);
    }

    #[test]
    fn test_handle_display() {
        let mut roster = Roster::new();
        let h = roster.insert(Combatant::new("a", Team::Party));
        assert_eq!(h.to_string(), "0v0");
    }
}

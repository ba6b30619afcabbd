//! Passive behaviors.
//!
//! A passive is one behavior attached to one combatant (its *owner*) for
//! the length of one battle. The battle subscribes it to the event kinds
//! in [`Passive::triggers`] and hands it every matching event together
//! with a [`TriggerContext`].
//!
//! Per-combatant state lives inside the passive instance, in a
//! [`StateMap`] keyed by [`CombatantHandle`]. Instances are created fresh
//! for every battle by the [`PassiveRegistry`](crate::registry::PassiveRegistry),
//! so nothing a passive remembers can outlive its battle.
//!
//! Modifiers a passive installs use its id as `source` and a name from
//! [`modifier_name`], which embeds the owner handle. Two owners of the
//! same passive therefore never overwrite each other's modifiers.

mod catalogue;
pub mod stacking;

pub use catalogue::{
    echo_strike, guardian_bond, lunar_cycle, mirror_ward, overcharge, pack_bond,
    purifying_light, stalwart_will, vampiric_siphon, EchoStrike, GuardianBond, LunarCycle,
    LunarPhase, MirrorWard, Overcharge, PackBond, PurifyingLight, StalwartWill, VampiricSiphon,
};
pub use stacking::{
    berserker_momentum, iron_resolve, tidal_focus, DecayRule, GainRule, StackCounter,
    StackTrigger, Stance, StanceConfig,
};

use crate::combatant::CombatantHandle;
use crate::context::TriggerContext;
use crate::error::EngineError;
use crate::event::{EventPayload, TriggerSet};
use std::collections::BTreeMap;

/// A behavior that reacts to battle events.
///
/// Implementations match on [`BattleEvent`](crate::event::BattleEvent)
/// exhaustively, so a new event kind has to be considered by every
/// passive before the crate compiles again.
pub trait Passive: Send {
    /// Registry id. Also the `source` of every modifier the passive installs.
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// Event kinds the passive is subscribed to when attached.
    fn triggers(&self) -> TriggerSet;

    /// React to one event.
    ///
    /// Stat blocks may be changed directly through `ctx`; damage, healing
    /// and ultimate charge are queued and resolved after this returns.
    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError>;

    /// Undo everything the passive holds for `who`: remove its modifiers
    /// and guards, drop hooks it added and forget the state entry.
    fn teardown(
        &mut self,
        who: CombatantHandle,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError>;

    /// Forget the state entry for `who` without touching the battle.
    fn forget(&mut self, who: CombatantHandle);

    /// Read-only stack count for `who`, for passives that count stacks.
    fn stacks(&self, _who: CombatantHandle) -> Option<u32> {
        None
    }

    /// Combatants the passive currently holds state for.
    fn tracked(&self) -> Vec<CombatantHandle>;

    /// Whether a tracked combatant's defeat tears its state down.
    fn clears_on_defeat(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for dyn Passive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Passive")
            .field("id", &self.id())
            .field("tracked", &self.tracked())
            .finish()
    }
}

/// Name of a modifier installed by passive `id` on behalf of `owner`.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{Combatant, Roster, Team};
/// use zzpassive::passive::modifier_name;
///
/// let mut roster = Roster::new();
/// let owner = roster.insert(Combatant::new("a", Team::Party));
/// assert_eq!(modifier_name("iron_resolve", "stance", owner), "iron_resolve.stance#0v0");
/// ```
pub fn modifier_name(id: &str, label: &str, owner: CombatantHandle) -> String {
    format!("{id}.{label}#{owner}")
}

/// Per-combatant auxiliary state of one passive instance.
///
/// Entries are created lazily the first time the passive sees a
/// combatant and removed on teardown.
#[derive(Debug, Clone)]
pub struct StateMap<S> {
    entries: BTreeMap<CombatantHandle, S>,
}

impl<S> Default for StateMap<S> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<S> StateMap<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `who`, created with `init` if absent.
    pub fn entry(&mut self, who: CombatantHandle, init: impl FnOnce() -> S) -> &mut S {
        self.entries.entry(who).or_insert_with(init)
    }

    pub fn get(&self, who: CombatantHandle) -> Option<&S> {
        self.entries.get(&who)
    }

    pub fn get_mut(&mut self, who: CombatantHandle) -> Option<&mut S> {
        self.entries.get_mut(&who)
    }

    pub fn remove(&mut self, who: CombatantHandle) -> Option<S> {
        self.entries.remove(&who)
    }

    pub fn contains(&self, who: CombatantHandle) -> bool {
        self.entries.contains_key(&who)
    }

    /// Tracked combatants, in handle order.
    pub fn handles(&self) -> Vec<CombatantHandle> {
        self.entries.keys().copied().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &S> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

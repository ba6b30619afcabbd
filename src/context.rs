//! The view of a battle a passive gets while it runs.
//!
//! A `TriggerContext` lends the passive the roster (so it can read and
//! mutate stat blocks directly) and collects everything that has to wait
//! until the passive returns: damage, healing and charge requests, and
//! changes to its own subscriptions. The battle applies those in order
//! once the handler is done.

use crate::bus::HandlerId;
use crate::combatant::{Combatant, CombatantHandle, Roster};
use crate::effects::{DamageRequest, HealKind, HealRequest, SideEffect};
use crate::error::EngineError;
use crate::event::EventKind;
use crate::stat_block::StatBlock;

/// Subscription change requested by a running handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCommand {
    Subscribe(EventKind),
    Unsubscribe(EventKind),
}

/// Work a handler left behind.
#[derive(Debug, Default)]
pub struct Deferred {
    pub effects: Vec<SideEffect>,
    pub commands: Vec<BusCommand>,
}

/// Battle access for one handler invocation.
pub struct TriggerContext<'a> {
    roster: &'a mut Roster,
    owner: CombatantHandle,
    handler: HandlerId,
    deferred: Deferred,
}

impl<'a> TriggerContext<'a> {
    pub fn new(roster: &'a mut Roster, owner: CombatantHandle, handler: HandlerId) -> Self {
        Self {
            roster,
            owner,
            handler,
            deferred: Deferred::default(),
        }
    }

    /// Combatant the running passive belongs to.
    pub fn owner(&self) -> CombatantHandle {
        self.owner
    }

    /// Identity of the running handler.
    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    /// Resolve a handle.
    pub fn combatant(&self, who: CombatantHandle) -> Option<&Combatant> {
        self.roster.get(who)
    }

    /// Whether `who` is still in the battle.
    pub fn contains(&self, who: CombatantHandle) -> bool {
        self.roster.contains(who)
    }

    /// Resolve a handle mutably.
    pub fn combatant_mut(&mut self, who: CombatantHandle) -> Option<&mut Combatant> {
        self.roster.get_mut(who)
    }

    /// Stat block of `who`, failing if the handle went stale.
    pub fn stats_mut(&mut self, who: CombatantHandle) -> Result<&mut StatBlock, EngineError> {
        self.roster
            .get_mut(who)
            .map(|c| &mut c.stats)
            .ok_or(EngineError::StaleHandle(who))
    }

    /// Effective attribute value of `who` (`0.0` for a stale handle).
    pub fn stat(&self, who: CombatantHandle, attribute: &str) -> f64 {
        self.roster
            .get(who)
            .map(|c| c.stats.get(attribute))
            .unwrap_or(0.0)
    }

    /// Living teammates of the owner.
    pub fn allies(&self) -> Vec<CombatantHandle> {
        self.roster.allies_of(self.owner)
    }

    /// Living opponents of the owner.
    pub fn foes(&self) -> Vec<CombatantHandle> {
        self.roster.foes_of(self.owner)
    }

    /// Whether `who` is on the owner's team (the owner included).
    pub fn is_ally(&self, who: CombatantHandle) -> bool {
        match (self.roster.get(self.owner), self.roster.get(who)) {
            (Some(owner), Some(other)) => owner.team == other.team,
            _ => false,
        }
    }

    /// Whether `who` is on the opposing team.
    pub fn is_foe(&self, who: CombatantHandle) -> bool {
        match (self.roster.get(self.owner), self.roster.get(who)) {
            (Some(owner), Some(other)) => owner.team != other.team,
            _ => false,
        }
    }

    /// Queue damage. Set `trigger_on_hit` to `false` on damage dealt in
    /// reaction to a hit.
    pub fn request_damage(&mut self, request: DamageRequest) {
        self.deferred.effects.push(SideEffect::Damage(request));
    }

    /// Queue healing.
    pub fn request_heal(&mut self, request: HealRequest) {
        self.deferred.effects.push(SideEffect::Heal(request));
    }

    /// Queue healing from the owner with the given kind and source name.
    pub fn heal(&mut self, target: CombatantHandle, amount: f64, kind: HealKind, source: &str) {
        let request = HealRequest::new(amount, self.owner, target, kind, source);
        self.request_heal(request);
    }

    /// Queue ultimate charge.
    pub fn add_ultimate_charge(&mut self, target: CombatantHandle, amount: u32) {
        if amount > 0 {
            self.deferred
                .effects
                .push(SideEffect::UltimateCharge { target, amount });
        }
    }

    /// Subscribe the running handler to another event kind.
    pub fn subscribe(&mut self, kind: EventKind) {
        self.deferred.commands.push(BusCommand::Subscribe(kind));
    }

    /// Unsubscribe the running handler from an event kind. Safe to repeat.
    pub fn unsubscribe(&mut self, kind: EventKind) {
        self.deferred.commands.push(BusCommand::Unsubscribe(kind));
    }

    /// Effects queued so far.
    pub fn pending_effects(&self) -> &[SideEffect] {
        &self.deferred.effects
    }

    /// End the invocation and hand back what it queued.
    pub fn finish(self) -> Deferred {
        self.deferred
    }
}

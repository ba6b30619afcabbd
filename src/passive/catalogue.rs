//! Concrete passives that are not plain stances.

use super::stacking::StackCounter;
use super::{modifier_name, Passive, StateMap};
use crate::attribute::names;
use crate::combatant::CombatantHandle;
use crate::context::TriggerContext;
use crate::effects::{DamageRequest, HealKind};
use crate::error::EngineError;
use crate::event::{BattleEvent, EventKind, EventPayload, TriggerSet};
use crate::modifier::Modifier;
use tracing::debug;

fn owner_alive(ctx: &TriggerContext<'_>) -> bool {
    ctx.combatant(ctx.owner()).is_some_and(|c| c.is_alive())
}

fn remove_modifier(ctx: &mut TriggerContext<'_>, who: CombatantHandle, name: &str) {
    if let Some(c) = ctx.combatant_mut(who) {
        c.stats.remove_by_name(name);
    }
}

/// Phase of [`LunarCycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LunarPhase {
    New,
    Waxing,
    Full,
    Waning,
}

impl LunarPhase {
    /// The phase after this one.
    pub fn next(self) -> Self {
        match self {
            LunarPhase::New => LunarPhase::Waxing,
            LunarPhase::Waxing => LunarPhase::Full,
            LunarPhase::Full => LunarPhase::Waning,
            LunarPhase::Waning => LunarPhase::New,
        }
    }

    /// Position in the cycle, `0..4`.
    pub fn ordinal(self) -> u32 {
        self as u32
    }

    fn bonuses(self) -> &'static [(&'static str, f64)] {
        match self {
            LunarPhase::New => &[(names::DEFENSE, 20.0)],
            LunarPhase::Waxing => &[(names::ATTACK, 15.0), (names::SPEED, 5.0)],
            LunarPhase::Full => &[(names::ATTACK, 40.0), (names::CRIT_RATE, 0.15)],
            LunarPhase::Waning => &[(names::MITIGATION, 0.1), (names::EFFECT_RESISTANCE, 0.1)],
        }
    }
}

/// Cycles New → Waxing → Full → Waning on each owner turn start. Using
/// the ultimate jumps straight to Full.
#[derive(Debug, Clone, Default)]
pub struct LunarCycle {
    phases: StateMap<LunarPhase>,
}

impl LunarCycle {
    pub const ID: &'static str = "lunar_cycle";

    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase of `who`.
    pub fn phase(&self, who: CombatantHandle) -> Option<LunarPhase> {
        self.phases.get(who).copied()
    }

    fn enter(&mut self, phase: LunarPhase, ctx: &mut TriggerContext<'_>) -> Result<(), EngineError> {
        let owner = ctx.owner();
        *self.phases.entry(owner, || phase) = phase;
        let modifier = phase.bonuses().iter().fold(
            Modifier::permanent(modifier_name(Self::ID, "phase", owner), Self::ID),
            |m, (attr, delta)| m.with_delta(*attr, *delta),
        );
        ctx.stats_mut(owner)?.add(modifier);
        debug!(passive = Self::ID, %owner, ?phase, "lunar phase");
        Ok(())
    }
}

impl Passive for LunarCycle {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Lunar Cycle"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[EventKind::TurnStart, EventKind::UltimateUsed])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        if !owner_alive(ctx) {
            return Ok(());
        }
        match &payload.event {
            BattleEvent::TurnStart { actor } if *actor == owner => {
                let phase = self.phase(owner).map_or(LunarPhase::New, LunarPhase::next);
                self.enter(phase, ctx)
            }
            BattleEvent::UltimateUsed { actor } if *actor == owner => {
                self.enter(LunarPhase::Full, ctx)
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::HitLanded { .. }
            | BattleEvent::CriticalHit { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        if self.phases.remove(who).is_some() {
            remove_modifier(ctx, who, &modifier_name(Self::ID, "phase", who));
        }
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.phases.remove(who);
    }

    fn stacks(&self, who: CombatantHandle) -> Option<u32> {
        self.phase(who).map(LunarPhase::ordinal)
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.phases.handles()
    }

    fn clears_on_defeat(&self) -> bool {
        true
    }
}

/// Owner hits heal the owner for part of the damage and drain attack from
/// the foe, which the owner keeps while the drain lasts.
#[derive(Debug, Clone, Default)]
pub struct VampiricSiphon {
    drained: StateMap<StackCounter>,
}

impl VampiricSiphon {
    pub const ID: &'static str = "vampiric_siphon";
    pub const HEAL_RATIO: f64 = 0.2;
    pub const DRAIN_PER_STACK: f64 = 5.0;
    pub const MAX_DRAIN_STACKS: u32 = 5;

    pub fn new() -> Self {
        Self::default()
    }

    /// Attack currently drained across every foe.
    pub fn total_drained(&self) -> f64 {
        self.drained
            .values()
            .map(|s| f64::from(s.value()) * Self::DRAIN_PER_STACK)
            .sum()
    }

    fn refresh_feast(&self, ctx: &mut TriggerContext<'_>) {
        let owner = ctx.owner();
        let name = modifier_name(Self::ID, "feast", owner);
        let total = self.total_drained();
        let Some(c) = ctx.combatant_mut(owner) else {
            return;
        };
        if total > 0.0 {
            c.stats
                .add(Modifier::permanent(name, Self::ID).with_delta(names::ATTACK, total));
        } else {
            c.stats.remove_by_name(&name);
        }
    }
}

impl Passive for VampiricSiphon {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Vampiric Siphon"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[EventKind::HitLanded])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        if !owner_alive(ctx) {
            return Ok(());
        }
        match &payload.event {
            BattleEvent::HitLanded {
                attacker,
                target,
                amount,
                ..
            } => {
                if *attacker != owner || !ctx.is_foe(*target) {
                    return Ok(());
                }
                ctx.heal(owner, amount * Self::HEAL_RATIO, HealKind::Siphon, Self::ID);

                let stacks = self
                    .drained
                    .entry(*target, || StackCounter::new(Self::MAX_DRAIN_STACKS));
                let n = stacks.gain(1);
                let drain = Modifier::permanent(modifier_name(Self::ID, "drain", owner), Self::ID)
                    .with_delta(names::ATTACK, -f64::from(n) * Self::DRAIN_PER_STACK);
                ctx.stats_mut(*target)?.add(drain);
                self.refresh_feast(ctx);
                Ok(())
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::CriticalHit { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        let drain = modifier_name(Self::ID, "drain", owner);
        let foes = if who == owner {
            self.drained.handles()
        } else {
            vec![who]
        };
        for foe in foes {
            if self.drained.remove(foe).is_some() {
                remove_modifier(ctx, foe, &drain);
            }
        }
        self.refresh_feast(ctx);
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.drained.remove(who);
    }

    fn stacks(&self, who: CombatantHandle) -> Option<u32> {
        self.drained.get(who).map(|s| s.value())
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.drained.handles()
    }
}

/// Shares the blows allies take from foes: part of each hit is healed back
/// on the ally and dealt to the owner instead.
#[derive(Debug, Clone, Default)]
pub struct GuardianBond {
    redirects: StateMap<u32>,
}

impl GuardianBond {
    pub const ID: &'static str = "guardian_bond";
    pub const REDIRECT_RATIO: f64 = 0.3;
    /// Redirects per ally between two owner turn starts.
    pub const MAX_REDIRECTS: u32 = 2;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Passive for GuardianBond {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Guardian Bond"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[EventKind::HitLanded, EventKind::TurnStart])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        if !owner_alive(ctx) {
            return Ok(());
        }
        match &payload.event {
            BattleEvent::HitLanded {
                attacker,
                target,
                amount,
                ..
            } => {
                let guarded = *target != owner && ctx.is_ally(*target) && ctx.is_foe(*attacker);
                if !guarded || *amount <= 0.0 {
                    return Ok(());
                }
                let used = self.redirects.entry(*target, || 0);
                if *used >= Self::MAX_REDIRECTS {
                    return Ok(());
                }
                *used += 1;
                let share = amount * Self::REDIRECT_RATIO;
                ctx.heal(*target, share, HealKind::Direct, Self::ID);
                ctx.request_damage(DamageRequest::new(share, *attacker, owner, false, Self::ID));
                Ok(())
            }
            BattleEvent::TurnStart { actor } if *actor == owner => {
                self.redirects.clear();
                Ok(())
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::CriticalHit { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        _ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        self.redirects.remove(who);
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.redirects.remove(who);
    }

    fn stacks(&self, who: CombatantHandle) -> Option<u32> {
        self.redirects.get(who).copied()
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.redirects.handles()
    }

    fn clears_on_defeat(&self) -> bool {
        true
    }
}

/// Reflects part of each foe hit back at the attacker while charges last.
#[derive(Debug, Clone, Default)]
pub struct MirrorWard {
    charges: StateMap<StackCounter>,
}

impl MirrorWard {
    pub const ID: &'static str = "mirror_ward";
    pub const REFLECT_RATIO: f64 = 0.25;
    pub const MAX_CHARGES: u32 = 3;

    pub fn new() -> Self {
        Self::default()
    }

    fn charges_of(&mut self, who: CombatantHandle) -> &mut StackCounter {
        self.charges
            .entry(who, || StackCounter::full(Self::MAX_CHARGES))
    }
}

impl Passive for MirrorWard {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Mirror Ward"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[
            EventKind::BattleStart,
            EventKind::TurnStart,
            EventKind::HitLanded,
        ])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        if !owner_alive(ctx) {
            return Ok(());
        }
        match &payload.event {
            BattleEvent::BattleStart => {
                self.charges_of(owner).fill();
                Ok(())
            }
            BattleEvent::TurnStart { actor } if *actor == owner => {
                self.charges_of(owner).gain(1);
                Ok(())
            }
            BattleEvent::HitLanded {
                attacker,
                target,
                amount,
                ..
            } => {
                if *target != owner || !ctx.is_foe(*attacker) || *amount <= 0.0 {
                    return Ok(());
                }
                let charges = self.charges_of(owner);
                if charges.value() == 0 {
                    return Ok(());
                }
                charges.decay(1);
                ctx.request_damage(DamageRequest::new(
                    amount * Self::REFLECT_RATIO,
                    owner,
                    *attacker,
                    false,
                    Self::ID,
                ));
                Ok(())
            }
            BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::CriticalHit { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        _ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        self.charges.remove(who);
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.charges.remove(who);
    }

    fn stacks(&self, who: CombatantHandle) -> Option<u32> {
        self.charges.get(who).map(|c| c.value())
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.charges.handles()
    }

    fn clears_on_defeat(&self) -> bool {
        true
    }
}

/// Critical hits by the owner echo for half their damage.
#[derive(Debug, Clone, Default)]
pub struct EchoStrike {
    echoes: StateMap<u32>,
}

impl EchoStrike {
    pub const ID: &'static str = "echo_strike";
    pub const ECHO_RATIO: f64 = 0.5;

    pub fn new() -> Self {
        Self::default()
    }

    /// Echoes fired for `who` so far.
    pub fn echoes(&self, who: CombatantHandle) -> u32 {
        self.echoes.get(who).copied().unwrap_or(0)
    }
}

impl Passive for EchoStrike {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Echo Strike"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[EventKind::CriticalHit])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        match &payload.event {
            BattleEvent::CriticalHit {
                attacker,
                target,
                amount,
            } => {
                if *attacker != owner || *target == owner || !ctx.contains(*target) {
                    return Ok(());
                }
                // Echoes never raise hit events of their own.
                ctx.request_damage(DamageRequest::new(
                    amount * Self::ECHO_RATIO,
                    owner,
                    *target,
                    false,
                    Self::ID,
                ));
                *self.echoes.entry(owner, || 0) += 1;
                Ok(())
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::HitLanded { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        _ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        self.echoes.remove(who);
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.echoes.remove(who);
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.echoes.handles()
    }
}

/// Every owner action feeds the ultimate; using it surges attack briefly.
#[derive(Debug, Clone, Default)]
pub struct Overcharge {
    actions: StateMap<u32>,
}

impl Overcharge {
    pub const ID: &'static str = "overcharge";
    pub const CHARGE_PER_ACTION: u32 = 10;
    pub const SURGE_ATTACK: f64 = 40.0;
    pub const SURGE_TICKS: u32 = 2;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Passive for Overcharge {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Overcharge"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[EventKind::ActionTaken, EventKind::UltimateUsed])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        if !owner_alive(ctx) {
            return Ok(());
        }
        match &payload.event {
            BattleEvent::ActionTaken { actor, .. } if *actor == owner => {
                let actions = self.actions.entry(owner, || 0);
                *actions = actions.saturating_add(1);
                ctx.add_ultimate_charge(owner, Self::CHARGE_PER_ACTION);
                Ok(())
            }
            BattleEvent::UltimateUsed { actor } if *actor == owner => {
                self.actions.entry(owner, || 0);
                let surge = Modifier::lasting(
                    modifier_name(Self::ID, "surge", owner),
                    Self::ID,
                    Self::SURGE_TICKS,
                )
                .with_delta(names::ATTACK, Self::SURGE_ATTACK);
                ctx.stats_mut(owner)?.add(surge);
                Ok(())
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::HitLanded { .. }
            | BattleEvent::CriticalHit { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        if self.actions.remove(who).is_some() {
            remove_modifier(ctx, who, &modifier_name(Self::ID, "surge", who));
        }
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.actions.remove(who);
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.actions.handles()
    }
}

/// Resisting effects hardens resistance further; effects that land wear
/// it down.
#[derive(Debug, Clone, Default)]
pub struct StalwartWill {
    stacks: StateMap<StackCounter>,
}

impl StalwartWill {
    pub const ID: &'static str = "stalwart_will";
    pub const MAX_STACKS: u32 = 5;
    pub const RESISTANCE_PER_STACK: f64 = 0.05;

    pub fn new() -> Self {
        Self::default()
    }

    fn refresh(&self, ctx: &mut TriggerContext<'_>) -> Result<(), EngineError> {
        let owner = ctx.owner();
        let name = modifier_name(Self::ID, "will", owner);
        let n = self.stacks.get(owner).map_or(0, |s| s.value());
        let stats = ctx.stats_mut(owner)?;
        if n == 0 {
            stats.remove_by_name(&name);
        } else {
            stats.add(
                Modifier::permanent(name, Self::ID)
                    .with_delta(names::EFFECT_RESISTANCE, f64::from(n) * Self::RESISTANCE_PER_STACK),
            );
        }
        Ok(())
    }
}

impl Passive for StalwartWill {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Stalwart Will"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[EventKind::EffectResisted, EventKind::EffectApplied])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        if !owner_alive(ctx) {
            return Ok(());
        }
        match &payload.event {
            BattleEvent::EffectResisted { target, .. } if *target == owner => {
                self.stacks
                    .entry(owner, || StackCounter::new(Self::MAX_STACKS))
                    .gain(1);
                self.refresh(ctx)
            }
            BattleEvent::EffectApplied { target, source, .. } if *target == owner => {
                // Buffs from teammates do not count.
                if source.is_some_and(|s| ctx.is_ally(s)) {
                    return Ok(());
                }
                self.stacks
                    .entry(owner, || StackCounter::new(Self::MAX_STACKS))
                    .decay(1);
                self.refresh(ctx)
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::HitLanded { .. }
            | BattleEvent::CriticalHit { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        if self.stacks.remove(who).is_some() {
            remove_modifier(ctx, who, &modifier_name(Self::ID, "will", who));
        }
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.stacks.remove(who);
    }

    fn stacks(&self, who: CombatantHandle) -> Option<u32> {
        self.stacks.get(who).map(|s| s.value())
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.stacks.handles()
    }

    fn clears_on_defeat(&self) -> bool {
        true
    }
}

/// Cleansing rewards the cleanser; enduring damage over time builds a
/// short-lived vitality bonus.
#[derive(Debug, Clone, Default)]
pub struct PurifyingLight {
    radiance: StateMap<StackCounter>,
}

impl PurifyingLight {
    pub const ID: &'static str = "purifying_light";
    pub const CLEANSE_HEAL_RATIO: f64 = 0.05;
    pub const CLEANSE_CHARGE: u32 = 5;
    pub const MAX_STACKS: u32 = 5;
    pub const VITALITY_PER_STACK: f64 = 0.02;
    pub const RADIANCE_TICKS: u32 = 3;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Passive for PurifyingLight {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Purifying Light"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[EventKind::DotCleansed, EventKind::DotTick])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        if !owner_alive(ctx) {
            return Ok(());
        }
        match &payload.event {
            BattleEvent::DotCleansed {
                target,
                cleanser: Some(cleanser),
                ..
            } if *cleanser == owner => {
                let max_hp = ctx
                    .combatant(*target)
                    .ok_or(EngineError::StaleHandle(*target))?
                    .max_hp();
                ctx.heal(
                    *target,
                    max_hp * Self::CLEANSE_HEAL_RATIO,
                    HealKind::Direct,
                    Self::ID,
                );
                ctx.add_ultimate_charge(owner, Self::CLEANSE_CHARGE);
                Ok(())
            }
            BattleEvent::DotTick { target, .. } if *target == owner => {
                let name = modifier_name(Self::ID, "radiance", owner);
                let expired = !ctx.stats_mut(owner)?.has_modifier(&name);
                let radiance = self
                    .radiance
                    .entry(owner, || StackCounter::new(Self::MAX_STACKS));
                if expired {
                    radiance.reset();
                }
                let n = radiance.gain(1);
                ctx.stats_mut(owner)?.add(
                    Modifier::lasting(name, Self::ID, Self::RADIANCE_TICKS)
                        .with_delta(names::VITALITY, f64::from(n) * Self::VITALITY_PER_STACK),
                );
                Ok(())
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::HitLanded { .. }
            | BattleEvent::CriticalHit { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        if self.radiance.remove(who).is_some() {
            remove_modifier(ctx, who, &modifier_name(Self::ID, "radiance", who));
        }
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.radiance.remove(who);
    }

    fn stacks(&self, who: CombatantHandle) -> Option<u32> {
        self.radiance.get(who).map(|s| s.value())
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.radiance.handles()
    }
}

/// Each summon the owner loses makes it permanently stronger.
#[derive(Debug, Clone, Default)]
pub struct PackBond {
    losses: StateMap<StackCounter>,
}

impl PackBond {
    pub const ID: &'static str = "pack_bond";
    pub const ATTACK_PER_STACK: f64 = 15.0;
    pub const MAX_STACKS: u32 = 3;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Passive for PackBond {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Pack Bond"
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[EventKind::SummonRemoved])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        match &payload.event {
            BattleEvent::SummonRemoved { summoner, .. } if *summoner == owner => {
                let n = self
                    .losses
                    .entry(owner, || StackCounter::new(Self::MAX_STACKS))
                    .gain(1);
                ctx.stats_mut(owner)?.add(
                    Modifier::permanent(modifier_name(Self::ID, "pack", owner), Self::ID)
                        .with_delta(names::ATTACK, f64::from(n) * Self::ATTACK_PER_STACK),
                );
                Ok(())
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
            | BattleEvent::HitLanded { .. }
            | BattleEvent::CriticalHit { .. }
            | BattleEvent::DotTick { .. }
            | BattleEvent::EffectApplied { .. }
            | BattleEvent::EffectResisted { .. }
            | BattleEvent::DotCleansed { .. }
            | BattleEvent::SummonRemoved { .. }
            | BattleEvent::UltimateUsed { .. }
            | BattleEvent::BattleEnd { .. } => Ok(()),
        }
    }

    fn teardown(
        &mut self,
        who: CombatantHandle,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        if self.losses.remove(who).is_some() {
            remove_modifier(ctx, who, &modifier_name(Self::ID, "pack", who));
        }
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.losses.remove(who);
    }

    fn stacks(&self, who: CombatantHandle) -> Option<u32> {
        self.losses.get(who).map(|s| s.value())
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.losses.handles()
    }
}

pub fn lunar_cycle() -> Box<dyn Passive> {
    Box::new(LunarCycle::new())
}

pub fn vampiric_siphon() -> Box<dyn Passive> {
    Box::new(VampiricSiphon::new())
}

pub fn guardian_bond() -> Box<dyn Passive> {
    Box::new(GuardianBond::new())
}

pub fn mirror_ward() -> Box<dyn Passive> {
    Box::new(MirrorWard::new())
}

pub fn echo_strike() -> Box<dyn Passive> {
    Box::new(EchoStrike::new())
}

pub fn overcharge() -> Box<dyn Passive> {
    Box::new(Overcharge::new())
}

pub fn stalwart_will() -> Box<dyn Passive> {
    Box::new(StalwartWill::new())
}

pub fn purifying_light() -> Box<dyn Passive> {
    Box::new(PurifyingLight::new())
}

pub fn pack_bond() -> Box<dyn Passive> {
    Box::new(PackBond::new())
}

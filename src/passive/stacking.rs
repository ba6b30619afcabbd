//! Stack counters and stance passives.
//!
//! Most stacking passives follow the same loop: a qualifying event adds
//! stacks under a gain rule, another removes them under a decay rule, and
//! crossing a threshold switches an empowered *stance* on or off. The
//! [`Stance`] passive implements that loop once; each concrete passive is
//! a [`StanceConfig`].

use super::{modifier_name, Passive, StateMap};
use crate::attribute::names;
use crate::combatant::CombatantHandle;
use crate::context::TriggerContext;
use crate::effects::HealKind;
use crate::error::EngineError;
use crate::event::{BattleEvent, EventKind, EventPayload, TriggerSet};
use crate::modifier::Modifier;
use tracing::debug;

/// Ultimate charge granted per enemy crit stored during a stance.
pub const CHARGE_PER_STORED_CRIT: u32 = 5;

/// A saturating counter bounded by `[0, max]`.
///
/// # Examples
///
/// ```rust
/// use zzpassive::passive::StackCounter;
///
/// let mut stacks = StackCounter::new(5);
/// assert_eq!(stacks.gain(3), 3);
/// assert_eq!(stacks.gain(u32::MAX), 5);
/// assert_eq!(stacks.decay(7), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackCounter {
    value: u32,
    max: u32,
}

impl StackCounter {
    /// Empty counter.
    pub fn new(max: u32) -> Self {
        Self { value: 0, max }
    }

    /// Counter at its maximum.
    pub fn full(max: u32) -> Self {
        Self { value: max, max }
    }

    pub fn value(self) -> u32 {
        self.value
    }

    pub fn max(self) -> u32 {
        self.max
    }

    pub fn is_full(self) -> bool {
        self.value == self.max
    }

    /// Add `n` stacks, saturating at the maximum. Returns the new value.
    pub fn gain(&mut self, n: u32) -> u32 {
        self.value = self.value.saturating_add(n).min(self.max);
        self.value
    }

    /// Remove `n` stacks, saturating at zero. Returns the new value.
    pub fn decay(&mut self, n: u32) -> u32 {
        self.value = self.value.saturating_sub(n);
        self.value
    }

    pub fn fill(&mut self) {
        self.value = self.max;
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }
}

/// How many stacks one qualifying trigger adds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainRule {
    /// Always the same amount.
    Flat(u32),
    /// `per_trigger` below `soft_cap`, half of it (at least 1) from there on.
    SoftCap { per_trigger: u32, soft_cap: u32 },
}

impl GainRule {
    /// Stacks to add given the current count.
    pub fn amount(self, current: u32) -> u32 {
        match self {
            GainRule::Flat(n) => n,
            GainRule::SoftCap {
                per_trigger,
                soft_cap,
            } => {
                if current >= soft_cap {
                    (per_trigger / 2).max(1)
                } else {
                    per_trigger
                }
            }
        }
    }
}

/// How many stacks one decay trigger removes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayRule {
    /// Always the same amount.
    Flat(u32),
    /// One stack per `per` damage taken, at least one.
    Proportional { per: f64 },
}

impl DecayRule {
    /// Stacks to remove for a trigger that carried `damage`.
    pub fn amount(self, damage: f64) -> u32 {
        match self {
            DecayRule::Flat(n) => n,
            DecayRule::Proportional { per } => {
                if per.is_nan() || per <= 0.0 || !damage.is_finite() {
                    return 1;
                }
                ((damage / per).floor() as u32).max(1)
            }
        }
    }
}

/// Owner-relative event that can feed or drain a stack counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackTrigger {
    /// The owner's hit landed on someone else.
    OwnerLandsHit,
    /// A hit landed on the owner.
    OwnerIsHit,
    /// The owner's turn began.
    OwnerTurnStart,
    /// The owner's turn ended.
    OwnerTurnEnd,
}

impl StackTrigger {
    /// Event kind this trigger listens on.
    pub fn kind(self) -> EventKind {
        match self {
            StackTrigger::OwnerLandsHit | StackTrigger::OwnerIsHit => EventKind::HitLanded,
            StackTrigger::OwnerTurnStart => EventKind::TurnStart,
            StackTrigger::OwnerTurnEnd => EventKind::TurnEnd,
        }
    }
}

/// Declarative description of a stance passive.
#[derive(Debug, Clone, Copy)]
pub struct StanceConfig {
    pub id: &'static str,
    pub display_name: &'static str,
    pub max_stacks: u32,
    /// The stance is active while stacks are at or above this.
    pub threshold: u32,
    pub gain_on: StackTrigger,
    pub gain: GainRule,
    pub decay_on: StackTrigger,
    pub decay: DecayRule,
    /// Attribute deltas of the stance modifier.
    pub bonuses: &'static [(&'static str, f64)],
    /// Healing refused while the stance is active.
    pub blocks_healing: Option<HealKind>,
    /// Store enemy crits on the owner during the stance and release them
    /// as ultimate charge when it ends.
    pub stores_enemy_crits: bool,
}

impl StanceConfig {
    pub const BERSERKER_MOMENTUM: StanceConfig = StanceConfig {
        id: "berserker_momentum",
        display_name: "Berserker Momentum",
        max_stacks: 5,
        threshold: 3,
        gain_on: StackTrigger::OwnerLandsHit,
        gain: GainRule::Flat(1),
        decay_on: StackTrigger::OwnerTurnEnd,
        decay: DecayRule::Flat(1),
        bonuses: &[(names::ATTACK, 30.0), (names::CRIT_RATE, 0.10)],
        blocks_healing: None,
        stores_enemy_crits: false,
    };

    pub const IRON_RESOLVE: StanceConfig = StanceConfig {
        id: "iron_resolve",
        display_name: "Iron Resolve",
        max_stacks: 20,
        threshold: 10,
        gain_on: StackTrigger::OwnerIsHit,
        gain: GainRule::SoftCap {
            per_trigger: 2,
            soft_cap: 10,
        },
        decay_on: StackTrigger::OwnerTurnEnd,
        decay: DecayRule::Flat(1),
        bonuses: &[(names::MITIGATION, 0.3), (names::DEFENSE, 40.0)],
        blocks_healing: Some(HealKind::OverTime),
        stores_enemy_crits: true,
    };

    pub const TIDAL_FOCUS: StanceConfig = StanceConfig {
        id: "tidal_focus",
        display_name: "Tidal Focus",
        max_stacks: 4,
        threshold: 2,
        gain_on: StackTrigger::OwnerTurnStart,
        gain: GainRule::Flat(1),
        decay_on: StackTrigger::OwnerIsHit,
        decay: DecayRule::Proportional { per: 100.0 },
        bonuses: &[(names::EFFECT_HIT_RATE, 0.25), (names::SPEED, 10.0)],
        blocks_healing: None,
        stores_enemy_crits: false,
    };
}

#[derive(Debug, Clone, Copy)]
struct StanceState {
    stacks: StackCounter,
    active: bool,
    stored_crits: u32,
}

/// Generic stacking-stance passive driven by a [`StanceConfig`].
#[derive(Debug, Clone)]
pub struct Stance {
    config: StanceConfig,
    state: StateMap<StanceState>,
}

impl Stance {
    pub fn new(config: StanceConfig) -> Self {
        Self {
            config,
            state: StateMap::new(),
        }
    }

    pub fn config(&self) -> &StanceConfig {
        &self.config
    }

    /// Whether the stance is on for `who`.
    pub fn is_active(&self, who: CombatantHandle) -> bool {
        self.state.get(who).is_some_and(|s| s.active)
    }

    /// Enemy crits stored for `who` during the current stance.
    pub fn stored_crits(&self, who: CombatantHandle) -> u32 {
        self.state.get(who).map_or(0, |s| s.stored_crits)
    }

    fn advance(
        &mut self,
        trigger: StackTrigger,
        damage: f64,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let config = self.config;
        let owner = ctx.owner();
        let state = self
            .state
            .entry(owner, || StanceState {
                stacks: StackCounter::new(config.max_stacks),
                active: false,
                stored_crits: 0,
            });
        if trigger == config.gain_on {
            let n = config.gain.amount(state.stacks.value());
            state.stacks.gain(n);
        }
        if trigger == config.decay_on {
            state.stacks.decay(config.decay.amount(damage));
        }
        sync(&config, state, ctx)
    }

    fn store_crit(&mut self, attacker: CombatantHandle, target: CombatantHandle, ctx: &TriggerContext<'_>) {
        let owner = ctx.owner();
        if target != owner || !ctx.is_foe(attacker) {
            return;
        }
        if let Some(state) = self.state.get_mut(owner) {
            if state.active {
                state.stored_crits = state.stored_crits.saturating_add(1);
            }
        }
    }
}

fn sync(
    config: &StanceConfig,
    state: &mut StanceState,
    ctx: &mut TriggerContext<'_>,
) -> Result<(), EngineError> {
    let owner = ctx.owner();
    let reached = state.stacks.value() >= config.threshold;
    if reached && !state.active {
        let name = modifier_name(config.id, "stance", owner);
        let stance = config
            .bonuses
            .iter()
            .fold(Modifier::permanent(name.clone(), config.id), |m, (attr, delta)| {
                m.with_delta(*attr, *delta)
            });
        ctx.stats_mut(owner)?.add(stance);
        if let Some(kind) = config.blocks_healing {
            if let Some(c) = ctx.combatant_mut(owner) {
                c.block_healing(name, kind);
            }
        }
        if config.stores_enemy_crits {
            ctx.subscribe(EventKind::CriticalHit);
        }
        state.active = true;
        debug!(passive = config.id, %owner, stacks = state.stacks.value(), "stance activated");
    } else if !reached && state.active {
        remove_stance(config, owner, ctx);
        if config.stores_enemy_crits {
            ctx.unsubscribe(EventKind::CriticalHit);
            ctx.add_ultimate_charge(
                owner,
                state.stored_crits.saturating_mul(CHARGE_PER_STORED_CRIT),
            );
        }
        state.stored_crits = 0;
        state.active = false;
        debug!(passive = config.id, %owner, stacks = state.stacks.value(), "stance deactivated");
    }
    Ok(())
}

fn remove_stance(config: &StanceConfig, who: CombatantHandle, ctx: &mut TriggerContext<'_>) {
    let name = modifier_name(config.id, "stance", who);
    if let Some(c) = ctx.combatant_mut(who) {
        c.stats.remove_by_name(&name);
        c.unblock_healing(&name);
    }
}

impl Passive for Stance {
    fn id(&self) -> &'static str {
        self.config.id
    }

    fn display_name(&self) -> &'static str {
        self.config.display_name
    }

    fn triggers(&self) -> TriggerSet {
        TriggerSet::of(&[self.config.gain_on.kind(), self.config.decay_on.kind()])
    }

    fn on_trigger(
        &mut self,
        payload: &EventPayload,
        ctx: &mut TriggerContext<'_>,
    ) -> Result<(), EngineError> {
        let owner = ctx.owner();
        if !ctx.combatant(owner).is_some_and(|c| c.is_alive()) {
            return Ok(());
        }
        match &payload.event {
            BattleEvent::HitLanded {
                attacker,
                target,
                amount,
                ..
            } => {
                if *attacker == owner && *target != owner {
                    self.advance(StackTrigger::OwnerLandsHit, 0.0, ctx)?;
                }
                if *target == owner {
                    self.advance(StackTrigger::OwnerIsHit, *amount, ctx)?;
                }
                Ok(())
            }
            BattleEvent::TurnStart { actor } if *actor == owner => {
                self.advance(StackTrigger::OwnerTurnStart, 0.0, ctx)
            }
            BattleEvent::TurnEnd { actor } if *actor == owner => {
                self.advance(StackTrigger::OwnerTurnEnd, 0.0, ctx)
            }
            BattleEvent::CriticalHit {
                attacker, target, ..
            } => {
                self.store_crit(*attacker, *target, ctx);
                Ok(())
            }
            BattleEvent::BattleStart
            | BattleEvent::TurnStart { .. }
            | BattleEvent::TurnEnd { .. }
            | BattleEvent::ActionTaken { .. }
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
        if let Some(state) = self.state.remove(who) {
            if state.active {
                remove_stance(&self.config, who, ctx);
                if self.config.stores_enemy_crits {
                    ctx.unsubscribe(EventKind::CriticalHit);
                }
            }
            debug!(passive = self.config.id, %who, "stance state cleared");
        }
        Ok(())
    }

    fn forget(&mut self, who: CombatantHandle) {
        self.state.remove(who);
    }

    fn stacks(&self, who: CombatantHandle) -> Option<u32> {
        self.state.get(who).map(|s| s.stacks.value())
    }

    fn tracked(&self) -> Vec<CombatantHandle> {
        self.state.handles()
    }

    fn clears_on_defeat(&self) -> bool {
        true
    }
}

/// +1 stack per hit the owner lands; attack and crit rate while at 3+.
pub fn berserker_momentum() -> Box<dyn Passive> {
    Box::new(Stance::new(StanceConfig::BERSERKER_MOMENTUM))
}

/// Stacks when struck, hardening mitigation and defense at 10+.
pub fn iron_resolve() -> Box<dyn Passive> {
    Box::new(Stance::new(StanceConfig::IRON_RESOLVE))
}

/// Builds focus each turn; heavy hits wash it away.
pub fn tidal_focus() -> Box<dyn Passive> {
    Box::new(Stance::new(StanceConfig::TIDAL_FOCUS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::combatant::{Combatant, Roster, Team};
    use crate::context::BusCommand;
    use crate::effects::SideEffect;

    struct Rig {
        roster: Roster,
        owner: CombatantHandle,
        foe: CombatantHandle,
        bus: EventBus,
    }

    impl Rig {
        fn new() -> Self {
            let mut roster = Roster::new();
            let owner = roster.insert(Combatant::new("owner", Team::Party));
            let foe = roster.insert(Combatant::new("foe", Team::Foes));
            Self {
                roster,
                owner,
                foe,
                bus: EventBus::new(),
            }
        }

        fn fire(&mut self, stance: &mut Stance, event: BattleEvent) -> crate::context::Deferred {
            let handler = self.bus.register();
            let mut ctx = TriggerContext::new(&mut self.roster, self.owner, handler);
            stance.on_trigger(&event.into(), &mut ctx).unwrap();
            ctx.finish()
        }

        fn hit(&self, attacker: CombatantHandle, target: CombatantHandle, amount: f64) -> BattleEvent {
            BattleEvent::HitLanded {
                attacker,
                target,
                amount,
                action: "attack".into(),
            }
        }
    }

    #[test]
    fn test_stack_counter_bounds() {
        let mut c = StackCounter::new(3);
        assert_eq!(c.decay(1), 0);
        assert_eq!(c.gain(2), 2);
        assert!(!c.is_full());
        c.fill();
        assert!(c.is_full());
        c.reset();
        assert_eq!(c.value(), 0);
        assert_eq!(StackCounter::full(4).value(), 4);
    }

    #[test]
    fn test_gain_rules() {
        let soft = GainRule::SoftCap {
            per_trigger: 2,
            soft_cap: 10,
        };
        assert_eq!(soft.amount(8), 2);
        assert_eq!(soft.amount(10), 1);
        assert_eq!(GainRule::SoftCap { per_trigger: 1, soft_cap: 0 }.amount(5), 1);
        assert_eq!(GainRule::Flat(3).amount(100), 3);
    }

    #[test]
    fn test_decay_rules() {
        let per = DecayRule::Proportional { per: 100.0 };
        assert_eq!(per.amount(250.0), 2);
        assert_eq!(per.amount(30.0), 1);
        assert_eq!(per.amount(f64::NAN), 1);
        assert_eq!(DecayRule::Proportional { per: 0.0 }.amount(500.0), 1);
        assert_eq!(DecayRule::Flat(2).amount(999.0), 2);
    }

    #[test]
    fn test_berserker_activates_at_threshold() {
        let mut rig = Rig::new();
        let mut stance = Stance::new(StanceConfig::BERSERKER_MOMENTUM);
        let hit = rig.hit(rig.owner, rig.foe, 10.0);

        for _ in 0..2 {
            rig.fire(&mut stance, hit.clone());
        }
        assert!(!stance.is_active(rig.owner));
        rig.fire(&mut stance, hit);
        assert!(stance.is_active(rig.owner));

        let atk = rig.roster.get(rig.owner).unwrap().stats.get(names::ATTACK);
        assert_eq!(atk, 130.0);
    }

    #[test]
    fn test_hits_on_others_are_ignored() {
        let mut rig = Rig::new();
        let mut stance = Stance::new(StanceConfig::BERSERKER_MOMENTUM);
        let foe_hit = rig.hit(rig.foe, rig.owner, 10.0);
        rig.fire(&mut stance, foe_hit);
        assert_eq!(stance.stacks(rig.owner), Some(0));
    }

    #[test]
    fn test_iron_resolve_soft_cap_and_heal_block() {
        let mut rig = Rig::new();
        let mut stance = Stance::new(StanceConfig::IRON_RESOLVE);
        let struck = rig.hit(rig.foe, rig.owner, 50.0);

        for _ in 0..4 {
            rig.fire(&mut stance, struck.clone());
        }
        assert_eq!(stance.stacks(rig.owner), Some(8));
        let deferred = rig.fire(&mut stance, struck.clone());
        assert_eq!(stance.stacks(rig.owner), Some(10));
        assert!(stance.is_active(rig.owner));
        assert_eq!(
            deferred.commands,
            vec![BusCommand::Subscribe(EventKind::CriticalHit)]
        );
        assert!(!rig
            .roster
            .get(rig.owner)
            .unwrap()
            .accepts_healing(HealKind::OverTime));

        rig.fire(&mut stance, struck);
        assert_eq!(stance.stacks(rig.owner), Some(11));
    }

    #[test]
    fn test_iron_resolve_releases_stored_crits() {
        let mut rig = Rig::new();
        let mut stance = Stance::new(StanceConfig::IRON_RESOLVE);
        let struck = rig.hit(rig.foe, rig.owner, 50.0);
        for _ in 0..5 {
            rig.fire(&mut stance, struck.clone());
        }
        let crit = BattleEvent::CriticalHit {
            attacker: rig.foe,
            target: rig.owner,
            amount: 80.0,
        };
        rig.fire(&mut stance, crit.clone());
        rig.fire(&mut stance, crit);
        assert_eq!(stance.stored_crits(rig.owner), 2);

        let deferred = rig.fire(&mut stance, BattleEvent::TurnEnd { actor: rig.owner });
        assert!(!stance.is_active(rig.owner));
        assert_eq!(
            deferred.effects,
            vec![SideEffect::UltimateCharge {
                target: rig.owner,
                amount: 2 * CHARGE_PER_STORED_CRIT
            }]
        );
        assert!(deferred
            .commands
            .contains(&BusCommand::Unsubscribe(EventKind::CriticalHit)));
        assert!(rig
            .roster
            .get(rig.owner)
            .unwrap()
            .accepts_healing(HealKind::OverTime));
    }

    #[test]
    fn test_tidal_focus_proportional_decay() {
        let mut rig = Rig::new();
        let mut stance = Stance::new(StanceConfig::TIDAL_FOCUS);
        for _ in 0..4 {
            rig.fire(&mut stance, BattleEvent::TurnStart { actor: rig.owner });
        }
        assert_eq!(stance.stacks(rig.owner), Some(4));
        let heavy = rig.hit(rig.foe, rig.owner, 250.0);
        rig.fire(&mut stance, heavy);
        assert_eq!(stance.stacks(rig.owner), Some(2));
        assert!(stance.is_active(rig.owner));
        let light = rig.hit(rig.foe, rig.owner, 20.0);
        rig.fire(&mut stance, light);
        assert!(!stance.is_active(rig.owner));
        let spd = rig.roster.get(rig.owner).unwrap().stats.get(names::SPEED);
        assert_eq!(spd, 100.0);
    }

    #[test]
    fn test_teardown_clears_everything() {
        let mut rig = Rig::new();
        let mut stance = Stance::new(StanceConfig::IRON_RESOLVE);
        let struck = rig.hit(rig.foe, rig.owner, 50.0);
        for _ in 0..5 {
            rig.fire(&mut stance, struck.clone());
        }
        let handler = rig.bus.register();
        let mut ctx = TriggerContext::new(&mut rig.roster, rig.owner, handler);
        stance.teardown(rig.owner, &mut ctx).unwrap();
        let deferred = ctx.finish();

        assert!(stance.tracked().is_empty());
        assert_eq!(
            deferred.commands,
            vec![BusCommand::Unsubscribe(EventKind::CriticalHit)]
        );
        let owner = rig.roster.get(rig.owner).unwrap();
        assert_eq!(owner.stats.count_from("iron_resolve"), 0);
        assert_eq!(owner.heal_guard_count(), 0);
    }
}

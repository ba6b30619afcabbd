//! Battle module.
//!
//! A [`Battle`] is the scope every passive instance lives in. It owns the
//! roster, the event bus, the passive instances attached to each
//! combatant and the [`CombatResolver`] that turns damage and healing
//! requests into HP changes.
//!
//! Each emitted event runs its subscribers one at a time. A handler's
//! queued side effects are resolved right after it returns, before the
//! next subscriber runs; damage that may trigger on hit emits
//! `hit_landed` (and `critical_hit`) as nested events at that point.
//!
//! Driving a turn:
//!
//! ```text
//! begin_turn → perform_attack (action_taken, hit_landed, critical_hit)
//!            → end_turn (turn_end, then modifiers tick)
//! ```

use crate::bus::{Dispatch, DispatchReport, EventBus, HandlerId};
use crate::combatant::{Combatant, CombatantHandle, Roster, Team};
use crate::config::BattleSetup;
use crate::context::{BusCommand, TriggerContext};
use crate::effects::{CombatResolver, DamageOutcome, DamageRequest, SideEffect, SimpleResolver};
use crate::error::EngineError;
use crate::event::{BattleEvent, EventPayload};
use crate::passive::Passive;
use crate::registry::PassiveRegistry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

struct PassiveSlot {
    owner: CombatantHandle,
    id: &'static str,
    /// `None` only while the passive is running.
    passive: Option<Box<dyn Passive>>,
}

/// Everything a handler can touch. Kept apart from the bus so the bus can
/// lend itself back to nested emissions.
struct World<R> {
    roster: Roster,
    passives: BTreeMap<HandlerId, PassiveSlot>,
    resolver: R,
}

fn apply_commands(bus: &mut EventBus, handler: HandlerId, commands: &[BusCommand]) {
    for command in commands {
        match *command {
            BusCommand::Subscribe(kind) => bus.subscribe(kind, handler),
            BusCommand::Unsubscribe(kind) => {
                bus.unsubscribe(kind, handler);
            }
        }
    }
}

impl<R: CombatResolver> World<R> {
    fn flush(&mut self, bus: &mut EventBus, effects: Vec<SideEffect>) {
        for effect in effects {
            self.resolve(bus, effect);
        }
    }

    fn resolve(&mut self, bus: &mut EventBus, effect: SideEffect) {
        match effect {
            SideEffect::Damage(request) => {
                self.resolve_damage(bus, &request);
            }
            SideEffect::Heal(request) => {
                self.resolver.apply_healing(&mut self.roster, &request);
            }
            SideEffect::UltimateCharge { target, amount } => {
                self.resolver
                    .add_ultimate_charge(&mut self.roster, target, amount);
            }
        }
    }

    /// Apply damage and announce it.
    ///
    /// A landed `trigger_on_hit` hit emits `hit_landed`, then `critical_hit`
    /// if it was critical; a defeat is settled last. When one of those
    /// events has to wait for a dispatch already in progress, everything
    /// after it waits too, so listeners always see hit, crit, defeat in
    /// that order.
    fn resolve_damage(&mut self, bus: &mut EventBus, request: &DamageRequest) -> DamageOutcome {
        let outcome = self.resolver.apply_damage(&mut self.roster, request);
        let mut queued = false;
        if request.trigger_on_hit && outcome.dealt > 0.0 {
            let hit = BattleEvent::HitLanded {
                attacker: request.attacker,
                target: request.target,
                amount: outcome.dealt,
                action: request.action.clone(),
            };
            queued = self.announce(bus, hit.into(), queued);
            if outcome.critical {
                let crit = BattleEvent::CriticalHit {
                    attacker: request.attacker,
                    target: request.target,
                    amount: outcome.dealt,
                };
                queued = self.announce(bus, crit.into(), queued);
            }
        }
        if outcome.defeated {
            if queued {
                bus.enqueue_defeat(request.target);
            } else {
                self.handle_defeat(bus, request.target);
            }
        }
        outcome
    }

    /// Emit `payload` now, or queue it if its kind is busy or something
    /// before it was queued. Returns whether it was queued.
    fn announce(&mut self, bus: &mut EventBus, payload: EventPayload, behind: bool) -> bool {
        if behind || bus.is_dispatching(payload.kind()) {
            bus.enqueue(payload);
            true
        } else {
            bus.emit(payload, self);
            false
        }
    }

    fn handle_defeat(&mut self, bus: &mut EventBus, who: CombatantHandle) {
        debug!(%who, "combatant defeated");
        let handlers: Vec<HandlerId> = self
            .passives
            .iter()
            .filter(|(_, slot)| {
                slot.passive
                    .as_ref()
                    .is_some_and(|p| p.clears_on_defeat() && p.tracked().contains(&who))
            })
            .map(|(handler, _)| *handler)
            .collect();
        for handler in handlers {
            self.teardown(bus, handler, who);
        }
    }

    /// Run `teardown(who)` on one passive and apply what it queued.
    fn teardown(&mut self, bus: &mut EventBus, handler: HandlerId, who: CombatantHandle) {
        let Some(slot) = self.passives.get_mut(&handler) else {
            return;
        };
        let (owner, id) = (slot.owner, slot.id);
        let Some(mut passive) = slot.passive.take() else {
            return;
        };
        let mut ctx = TriggerContext::new(&mut self.roster, owner, handler);
        let result = passive.teardown(who, &mut ctx);
        let deferred = ctx.finish();
        // Whatever happened, the state entry must not survive.
        passive.forget(who);
        if let Some(slot) = self.passives.get_mut(&handler) {
            slot.passive = Some(passive);
        }
        apply_commands(bus, handler, &deferred.commands);
        match result {
            Ok(()) => self.flush(bus, deferred.effects),
            Err(err) => warn!(passive = id, %who, error = %err, "teardown failed"),
        }
        debug!(passive = id, %who, "passive state torn down");
    }

    /// Tear down every tracked combatant of one passive.
    fn teardown_all(&mut self, bus: &mut EventBus, handler: HandlerId) {
        let tracked = self
            .passives
            .get(&handler)
            .and_then(|slot| slot.passive.as_ref())
            .map(|p| p.tracked())
            .unwrap_or_default();
        for who in tracked {
            self.teardown(bus, handler, who);
        }
    }
}

impl<R: CombatResolver> Dispatch for World<R> {
    fn dispatch(
        &mut self,
        bus: &mut EventBus,
        handler: HandlerId,
        payload: &EventPayload,
    ) -> Result<(), EngineError> {
        let Some(slot) = self.passives.get_mut(&handler) else {
            bus.remove_handler(handler);
            return Err(EngineError::UnknownHandler(handler));
        };
        let (owner, id) = (slot.owner, slot.id);
        if !self.roster.contains(owner) {
            debug!(passive = id, %owner, "owner left the battle, unsubscribing");
            bus.remove_handler(handler);
            return Ok(());
        }
        let Some(mut passive) = slot.passive.take() else {
            return Ok(());
        };

        let mut ctx = TriggerContext::new(&mut self.roster, owner, handler);
        let result = passive.on_trigger(payload, &mut ctx);
        let deferred = ctx.finish();
        if let Some(slot) = self.passives.get_mut(&handler) {
            slot.passive = Some(passive);
        }
        apply_commands(bus, handler, &deferred.commands);

        match result {
            Ok(()) => {
                self.flush(bus, deferred.effects);
                Ok(())
            }
            Err(err) => Err(EngineError::handler(id, err)),
        }
    }

    fn settle_defeat(&mut self, bus: &mut EventBus, who: CombatantHandle) {
        self.handle_defeat(bus, who);
    }
}

/// One battle: combatants, their passives and the event bus connecting them.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{Battle, Combatant, Team};
/// use zzpassive::attribute::names;
/// use zzpassive::registry::PassiveRegistry;
///
/// let registry = PassiveRegistry::builtin();
/// let mut battle: Battle = Battle::default();
/// let hero = battle.prepare(
///     Combatant::new("hero", Team::Party),
///     &["berserker_momentum"],
///     &registry,
/// );
/// let slime = battle.add_combatant(Combatant::new("slime", Team::Foes));
///
/// battle.start();
/// battle.begin_turn(hero);
/// for _ in 0..3 {
///     battle.perform_attack(hero, slime, 10.0, false);
/// }
/// assert_eq!(battle.stacks(hero, "berserker_momentum"), Some(3));
/// assert_eq!(battle.combatant(hero).unwrap().stats.get(names::ATTACK), 130.0);
///
/// battle.end(Some(Team::Party));
/// assert_eq!(battle.combatant(hero).unwrap().stats.get(names::ATTACK), 100.0);
/// ```
pub struct Battle<R: CombatResolver = SimpleResolver> {
    bus: EventBus,
    world: World<R>,
    ended: bool,
}

impl Default for Battle<SimpleResolver> {
    fn default() -> Self {
        Self::new(SimpleResolver::new())
    }
}

impl<R: CombatResolver> Battle<R> {
    /// Empty battle resolving combat through `resolver`.
    pub fn new(resolver: R) -> Self {
        Self {
            bus: EventBus::new(),
            world: World {
                roster: Roster::new(),
                passives: BTreeMap::new(),
                resolver,
            },
            ended: false,
        }
    }

    /// Build a battle from a setup document.
    ///
    /// Returns the battle and the handles of the combatants, in setup order.
    /// Unknown passive ids and malformed modifiers are skipped with a warning.
    pub fn from_setup(
        setup: &BattleSetup,
        registry: &PassiveRegistry,
        resolver: R,
    ) -> (Self, Vec<CombatantHandle>) {
        let mut battle = Self::new(resolver);
        let handles = setup
            .combatants
            .iter()
            .map(|spec| battle.prepare(spec.build(), &spec.passives, registry))
            .collect();
        (battle, handles)
    }

    /// Add a combatant with no passives.
    pub fn add_combatant(&mut self, combatant: Combatant) -> CombatantHandle {
        self.world.roster.insert(combatant)
    }

    /// Add a combatant and attach fresh instances of `passive_ids`, in order.
    pub fn prepare<S: AsRef<str>>(
        &mut self,
        combatant: Combatant,
        passive_ids: &[S],
        registry: &PassiveRegistry,
    ) -> CombatantHandle {
        let handle = self.add_combatant(combatant);
        for passive in registry.instantiate_all(passive_ids) {
            if let Err(err) = self.attach(handle, passive) {
                warn!(%handle, error = %err, "could not attach passive");
            }
        }
        handle
    }

    /// Attach a passive instance to `owner` and subscribe it.
    ///
    /// # Errors
    ///
    /// `EngineError::StaleHandle` if `owner` is not in the battle,
    /// `EngineError::BattleEnded` after [`Battle::end`].
    pub fn attach(
        &mut self,
        owner: CombatantHandle,
        passive: Box<dyn Passive>,
    ) -> Result<HandlerId, EngineError> {
        if self.ended {
            return Err(EngineError::BattleEnded);
        }
        if !self.world.roster.contains(owner) {
            return Err(EngineError::StaleHandle(owner));
        }
        let handler = self.bus.register();
        for kind in passive.triggers().iter() {
            self.bus.subscribe(kind, handler);
        }
        debug!(passive = passive.id(), %owner, %handler, "passive attached");
        self.world.passives.insert(
            handler,
            PassiveSlot {
                owner,
                id: passive.id(),
                passive: Some(passive),
            },
        );
        Ok(handler)
    }

    /// Emit an event to its subscribers. Does nothing after the battle ended.
    pub fn emit(&mut self, event: impl Into<EventPayload>) -> DispatchReport {
        let payload = event.into();
        if self.ended {
            warn!(event = %payload.kind(), "emit after battle end ignored");
            return DispatchReport::default();
        }
        self.bus.emit(payload, &mut self.world)
    }

    /// Resolve one side effect on behalf of the driver.
    pub fn request(&mut self, effect: SideEffect) {
        if self.ended {
            warn!("side effect after battle end ignored");
            return;
        }
        self.world.resolve(&mut self.bus, effect);
    }

    /// Emit `battle_start`.
    pub fn start(&mut self) -> DispatchReport {
        self.emit(BattleEvent::BattleStart)
    }

    /// Emit `turn_start` for `actor`.
    pub fn begin_turn(&mut self, actor: CombatantHandle) -> DispatchReport {
        self.emit(BattleEvent::TurnStart { actor })
    }

    /// `attacker` attacks `target`: emits `action_taken`, then resolves the
    /// damage, which emits `hit_landed` and `critical_hit` when it lands.
    pub fn perform_attack(
        &mut self,
        attacker: CombatantHandle,
        target: CombatantHandle,
        amount: f64,
        critical: bool,
    ) -> DamageOutcome {
        if self.ended {
            warn!(%attacker, "attack after battle end ignored");
            return DamageOutcome::default();
        }
        self.emit(BattleEvent::ActionTaken {
            actor: attacker,
            action: "attack".to_string(),
        });
        let request = DamageRequest::new(amount, attacker, target, true, "attack").critical(critical);
        self.world.resolve_damage(&mut self.bus, &request)
    }

    /// Spend a full ultimate gauge and emit `ultimate_used`.
    ///
    /// Returns `false` (and emits nothing) if the gauge is not full.
    pub fn use_ultimate(&mut self, actor: CombatantHandle) -> bool {
        let Some(c) = self.world.roster.get_mut(actor) else {
            return false;
        };
        if self.ended || c.ultimate_charge < Combatant::MAX_ULTIMATE_CHARGE {
            return false;
        }
        c.ultimate_charge = 0;
        self.emit(BattleEvent::UltimateUsed { actor });
        true
    }

    /// Emit `turn_end` for `actor`, then tick its modifiers.
    pub fn end_turn(&mut self, actor: CombatantHandle) -> DispatchReport {
        let report = self.emit(BattleEvent::TurnEnd { actor });
        self.tick_modifiers(actor);
        report
    }

    /// Tick `who`'s modifiers once. Returns the names that expired.
    pub fn tick_modifiers(&mut self, who: CombatantHandle) -> Vec<String> {
        self.world
            .roster
            .get_mut(who)
            .map(|c| c.stats.tick())
            .unwrap_or_default()
    }

    /// Remove a combatant from the battle.
    ///
    /// Summons announce `summon_removed` first. Then every passive tears
    /// down its state for the combatant, the combatant's own passives are
    /// torn down and unsubscribed, and finally it leaves the roster.
    pub fn remove_combatant(&mut self, who: CombatantHandle) -> Option<Combatant> {
        let summoner = self.world.roster.get(who)?.summoner;
        if let Some(summoner) = summoner {
            self.emit(BattleEvent::SummonRemoved {
                summon: who,
                summoner,
            });
        }

        let handlers: Vec<(HandlerId, CombatantHandle)> = self
            .world
            .passives
            .iter()
            .map(|(handler, slot)| (*handler, slot.owner))
            .collect();
        for (handler, owner) in handlers {
            if owner == who {
                self.world.teardown_all(&mut self.bus, handler);
                self.bus.remove_handler(handler);
                self.world.passives.remove(&handler);
            } else {
                self.world.teardown(&mut self.bus, handler, who);
            }
        }
        debug!(%who, "combatant removed");
        self.world.roster.remove(who)
    }

    /// End the battle.
    ///
    /// Emits `battle_end`, tears down every passive's state, removes every
    /// modifier whose source is an attached passive, drops heal guards and
    /// unsubscribes all handlers. The battle ignores further events.
    pub fn end(&mut self, winner: Option<Team>) -> DispatchReport {
        if self.ended {
            warn!("battle already ended");
            return DispatchReport::default();
        }
        let report = self.emit(BattleEvent::BattleEnd { winner });

        let handlers: Vec<HandlerId> = self.world.passives.keys().copied().collect();
        for handler in &handlers {
            self.world.teardown_all(&mut self.bus, *handler);
            self.bus.remove_handler(*handler);
        }

        let sources: BTreeSet<&'static str> =
            self.world.passives.values().map(|slot| slot.id).collect();
        for handle in self.world.roster.handles() {
            if let Some(c) = self.world.roster.get_mut(handle) {
                for source in &sources {
                    c.stats.remove_by_source(source);
                }
                c.clear_heal_guards();
            }
        }

        self.ended = true;
        debug!(?winner, handlers = handlers.len(), "battle ended");
        report
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn passive_of(&self, owner: CombatantHandle, id: &str) -> Option<&dyn Passive> {
        self.world
            .passives
            .values()
            .filter(|slot| slot.owner == owner && slot.id == id)
            .find_map(|slot| slot.passive.as_deref())
    }

    /// Stack count of `owner`'s passive `id` for `owner` itself.
    pub fn stacks(&self, owner: CombatantHandle, id: &str) -> Option<u32> {
        self.passive_of(owner, id)?.stacks(owner)
    }

    /// Stack count `owner`'s passive `id` holds for `who`.
    pub fn stacks_for(&self, owner: CombatantHandle, id: &str, who: CombatantHandle) -> Option<u32> {
        self.passive_of(owner, id)?.stacks(who)
    }

    /// Combatants `owner`'s passive `id` holds state for.
    pub fn tracked_by(&self, owner: CombatantHandle, id: &str) -> Vec<CombatantHandle> {
        self.passive_of(owner, id)
            .map(|p| p.tracked())
            .unwrap_or_default()
    }

    /// Ids of the passives attached to `owner`, in attach order.
    pub fn passive_ids(&self, owner: CombatantHandle) -> Vec<&'static str> {
        self.world
            .passives
            .values()
            .filter(|slot| slot.owner == owner)
            .map(|slot| slot.id)
            .collect()
    }

    pub fn combatant(&self, who: CombatantHandle) -> Option<&Combatant> {
        self.world.roster.get(who)
    }

    pub fn combatant_mut(&mut self, who: CombatantHandle) -> Option<&mut Combatant> {
        self.world.roster.get_mut(who)
    }

    pub fn roster(&self) -> &Roster {
        &self.world.roster
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn resolver(&self) -> &R {
        &self.world.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.world.resolver
    }
}

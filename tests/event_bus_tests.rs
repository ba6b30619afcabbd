use proptest::prelude::*;
use zzpassive::*;

fn turn_end(actor: CombatantHandle) -> EventPayload {
    BattleEvent::TurnEnd { actor }.into()
}

fn some_handle() -> CombatantHandle {
    let mut roster = Roster::new();
    roster.insert(Combatant::new("a", Team::Party))
}

/// Dispatcher that scripts what each handler does to the bus.
#[derive(Default)]
struct Script {
    log: Vec<(HandlerId, EventKind)>,
    depth: usize,
    max_depth: usize,
    /// Handler that re-emits the same kind once.
    reemit: Option<HandlerId>,
    /// Handler that unsubscribes another handler from turn_end.
    unsubscriber: Option<(HandlerId, HandlerId)>,
    /// Handler that subscribes a new handler to turn_end.
    subscriber: Option<(HandlerId, HandlerId)>,
    /// Handler that emits battle_start from inside turn_end.
    nester: Option<HandlerId>,
}

impl Dispatch for Script {
    fn dispatch(
        &mut self,
        bus: &mut EventBus,
        handler: HandlerId,
        payload: &EventPayload,
    ) -> Result<(), EngineError> {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.log.push((handler, payload.kind()));

        if self.reemit == Some(handler) && payload.kind() == EventKind::TurnEnd {
            self.reemit = None;
            bus.emit(payload.clone(), self);
        }
        if let Some((who, victim)) = self.unsubscriber {
            if who == handler {
                bus.unsubscribe(EventKind::TurnEnd, victim);
            }
        }
        if let Some((who, newcomer)) = self.subscriber {
            if who == handler {
                bus.subscribe(EventKind::TurnEnd, newcomer);
            }
        }
        if self.nester == Some(handler) && payload.kind() == EventKind::TurnEnd {
            bus.emit(BattleEvent::BattleStart.into(), self);
        }

        self.depth -= 1;
        Ok(())
    }
}

#[test]
fn test_same_kind_reemission_is_deferred() {
    let mut bus = EventBus::new();
    let a = bus.register();
    let b = bus.register();
    bus.subscribe(EventKind::TurnEnd, a);
    bus.subscribe(EventKind::TurnEnd, b);

    let mut script = Script {
        reemit: Some(a),
        ..Script::default()
    };
    let report = bus.emit(turn_end(some_handle()), &mut script);

    // a, b for the first emission; a, b again for the deferred one.
    let order: Vec<_> = script.log.iter().map(|(h, _)| *h).collect();
    assert_eq!(order, vec![a, b, a, b]);
    assert_eq!(script.max_depth, 1);
    assert_eq!(report.invoked, 4);
    assert!(!bus.is_dispatching(EventKind::TurnEnd));
}

#[test]
fn test_different_kind_nests_immediately() {
    let mut bus = EventBus::new();
    let a = bus.register();
    let b = bus.register();
    let starter = bus.register();
    bus.subscribe(EventKind::TurnEnd, a);
    bus.subscribe(EventKind::TurnEnd, b);
    bus.subscribe(EventKind::BattleStart, starter);

    let mut script = Script {
        nester: Some(a),
        ..Script::default()
    };
    bus.emit(turn_end(some_handle()), &mut script);

    let order: Vec<_> = script.log.iter().map(|(h, _)| *h).collect();
    assert_eq!(order, vec![a, starter, b]);
    assert_eq!(script.max_depth, 2);
}

#[test]
fn test_unsubscribed_mid_emission_is_skipped() {
    let mut bus = EventBus::new();
    let a = bus.register();
    let b = bus.register();
    bus.subscribe(EventKind::TurnEnd, a);
    bus.subscribe(EventKind::TurnEnd, b);

    let mut script = Script {
        unsubscriber: Some((a, b)),
        ..Script::default()
    };
    let report = bus.emit(turn_end(some_handle()), &mut script);
    assert_eq!(report.invoked, 1);
    assert_eq!(bus.subscribers(EventKind::TurnEnd), &[a]);
}

#[test]
fn test_subscribed_mid_emission_waits() {
    let mut bus = EventBus::new();
    let a = bus.register();
    let late = bus.register();
    bus.subscribe(EventKind::TurnEnd, a);

    let mut script = Script {
        subscriber: Some((a, late)),
        ..Script::default()
    };
    assert_eq!(bus.emit(turn_end(some_handle()), &mut script).invoked, 1);
    assert_eq!(bus.emit(turn_end(some_handle()), &mut script).invoked, 2);
}

#[test]
fn test_unsubscribe_twice_leaves_same_list() {
    let mut bus = EventBus::new();
    let a = bus.register();
    let b = bus.register();
    let c = bus.register();
    for h in [a, b, c] {
        bus.subscribe(EventKind::HitLanded, h);
    }
    assert!(bus.unsubscribe(EventKind::HitLanded, b));
    let after_first = bus.subscribers(EventKind::HitLanded).to_vec();
    assert!(!bus.unsubscribe(EventKind::HitLanded, b));
    assert_eq!(bus.subscribers(EventKind::HitLanded), after_first.as_slice());
    assert!(!bus.unsubscribe(EventKind::DotTick, a));
}

#[test]
fn test_emit_without_subscribers() {
    let mut bus = EventBus::new();
    let mut script = Script::default();
    let report = bus.emit(BattleEvent::BattleStart.into(), &mut script);
    assert_eq!(report, DispatchReport::default());
}

proptest! {
    #[test]
    fn prop_unsubscribe_is_idempotent(
        subs in prop::collection::vec((0usize..6, 0usize..13), 0..40),
        target in (0usize..6, 0usize..13),
    ) {
        let mut bus = EventBus::new();
        let handlers: Vec<HandlerId> = (0..6).map(|_| bus.register()).collect();
        for (h, k) in subs {
            bus.subscribe(EventKind::ALL[k], handlers[h]);
        }
        let kind = EventKind::ALL[target.1];
        let handler = handlers[target.0];

        bus.unsubscribe(kind, handler);
        let snapshot: Vec<Vec<HandlerId>> =
            EventKind::ALL.iter().map(|k| bus.subscribers(*k).to_vec()).collect();
        prop_assert!(!bus.unsubscribe(kind, handler));
        let again: Vec<Vec<HandlerId>> =
            EventKind::ALL.iter().map(|k| bus.subscribers(*k).to_vec()).collect();
        prop_assert_eq!(snapshot, again);
        prop_assert!(!bus.is_subscribed(kind, handler));
    }
}

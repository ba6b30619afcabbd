//! Event bus module.
//!
//! The `EventBus` maps each [`EventKind`] to an ordered list of
//! [`HandlerId`]s and drives emission. It does not own the handlers
//! themselves: invoking one is delegated to a [`Dispatch`]
//! implementation (the battle), which gets the bus back so the handler's
//! side effects can emit nested events.
//!
//! Dispatch rules:
//! 1. handlers run in subscription order, each to completion before the next;
//! 2. the subscriber list is snapshotted when an emission starts; handlers
//!    unsubscribed mid-emission are skipped, handlers subscribed
//!    mid-emission wait for the next one;
//! 3. a failing handler is logged and the rest still run;
//! 4. an event kind never re-enters itself: emitting a kind that is
//!    already dispatching queues it until that dispatch finishes;
//! 5. queued work runs strictly in the order it was queued. Follow-ups of
//!    a queued event (its `critical_hit`, a defeat it caused) are queued
//!    behind it with [`EventBus::enqueue`] and [`EventBus::enqueue_defeat`].

use crate::combatant::CombatantHandle;
use crate::error::EngineError;
use crate::event::{EventKind, EventPayload, TriggerSet};
use std::collections::{BTreeMap, VecDeque};
use tracing::{trace, warn};

/// Stable, comparable identity of a subscribed handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Raw numeric id, unique within one bus.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Runs one handler for the bus.
pub trait Dispatch {
    /// Invoke `handler` for `payload`, including every side effect it
    /// requests, before returning.
    fn dispatch(
        &mut self,
        bus: &mut EventBus,
        handler: HandlerId,
        payload: &EventPayload,
    ) -> Result<(), EngineError>;

    /// Settle a defeat that was queued behind deferred events. Runs once
    /// every event queued before it has been dispatched.
    fn settle_defeat(&mut self, bus: &mut EventBus, who: CombatantHandle) {
        let _ = (bus, who);
    }
}

/// Work waiting for a busy event kind.
#[derive(Debug, Clone, PartialEq)]
enum Queued {
    Event(EventPayload),
    Defeat(CombatantHandle),
}

impl Queued {
    fn blocked_by(&self, dispatching: TriggerSet) -> bool {
        match self {
            Queued::Event(payload) => dispatching.contains(payload.kind()),
            Queued::Defeat(_) => false,
        }
    }
}

/// What an emission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Handlers invoked, nested and deferred emissions included.
    pub invoked: usize,
    /// Handlers that returned an error.
    pub failed: usize,
    /// Emissions queued because their kind was already dispatching.
    pub deferred: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.invoked += other.invoked;
        self.failed += other.failed;
        self.deferred += other.deferred;
    }
}

/// Publish/subscribe registry for one battle.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{EventBus, EventKind};
///
/// let mut bus = EventBus::new();
/// let h = bus.register();
/// bus.subscribe(EventKind::TurnEnd, h);
/// assert!(bus.is_subscribed(EventKind::TurnEnd, h));
///
/// assert!(bus.unsubscribe(EventKind::TurnEnd, h));
/// assert!(!bus.unsubscribe(EventKind::TurnEnd, h));
/// assert!(bus.subscribers(EventKind::TurnEnd).is_empty());
/// ```
#[derive(Debug, Default)]
pub struct EventBus {
    next_handler: u64,
    subscribers: BTreeMap<EventKind, Vec<HandlerId>>,
    dispatching: TriggerSet,
    deferred: VecDeque<Queued>,
}

impl EventBus {
    /// Empty bus with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh handler identity.
    pub fn register(&mut self) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        id
    }

    /// Append `handler` to the subscribers of `kind`.
    ///
    /// Subscribing a handler that is already subscribed to `kind` keeps
    /// its original position.
    pub fn subscribe(&mut self, kind: EventKind, handler: HandlerId) {
        let list = self.subscribers.entry(kind).or_default();
        if !list.contains(&handler) {
            list.push(handler);
        }
    }

    /// Remove `handler` from `kind`. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, kind: EventKind, handler: HandlerId) -> bool {
        let Some(list) = self.subscribers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| *h != handler);
        before != list.len()
    }

    /// Remove `handler` from every kind. Returns how many subscriptions went.
    pub fn remove_handler(&mut self, handler: HandlerId) -> usize {
        self.subscribers
            .values_mut()
            .map(|list| {
                let before = list.len();
                list.retain(|h| *h != handler);
                before - list.len()
            })
            .sum()
    }

    /// Subscribers of `kind`, in invocation order.
    pub fn subscribers(&self, kind: EventKind) -> &[HandlerId] {
        self.subscribers
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `handler` is currently subscribed to `kind`.
    pub fn is_subscribed(&self, kind: EventKind, handler: HandlerId) -> bool {
        self.subscribers(kind).contains(&handler)
    }

    /// Every kind `handler` is subscribed to.
    pub fn subscriptions_of(&self, handler: HandlerId) -> TriggerSet {
        let mut set = TriggerSet::EMPTY;
        for (kind, list) in &self.subscribers {
            if list.contains(&handler) {
                set.insert(*kind);
            }
        }
        set
    }

    /// Total number of subscriptions across all kinds.
    pub fn subscription_count(&self) -> usize {
        self.subscribers.values().map(Vec::len).sum()
    }

    /// Whether `kind` is currently being dispatched.
    pub fn is_dispatching(&self, kind: EventKind) -> bool {
        self.dispatching.contains(kind)
    }

    /// Whether queued work is waiting to run.
    pub fn has_pending(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Queue `payload` behind everything already queued. It is emitted
    /// when the dispatch in progress finishes; with nothing dispatching it
    /// waits for the next [`EventBus::emit`].
    pub fn enqueue(&mut self, payload: EventPayload) {
        trace!(event = %payload.kind(), "queueing follow-up emission");
        self.deferred.push_back(Queued::Event(payload));
    }

    /// Queue the defeat of `who` behind everything already queued. The
    /// dispatcher's [`Dispatch::settle_defeat`] runs when its turn comes.
    pub fn enqueue_defeat(&mut self, who: CombatantHandle) {
        trace!(%who, "queueing defeat");
        self.deferred.push_back(Queued::Defeat(who));
    }

    /// Emit `payload` to every subscriber of its kind.
    pub fn emit<D>(&mut self, payload: EventPayload, dispatcher: &mut D) -> DispatchReport
    where
        D: Dispatch + ?Sized,
    {
        let kind = payload.kind();
        if self.dispatching.contains(kind) {
            trace!(event = %kind, "deferring re-entrant emission");
            self.deferred.push_back(Queued::Event(payload));
            return DispatchReport {
                deferred: 1,
                ..DispatchReport::default()
            };
        }

        self.dispatching.insert(kind);
        let mut report = DispatchReport::default();
        let snapshot = self.subscribers(kind).to_vec();
        for handler in snapshot {
            if !self.is_subscribed(kind, handler) {
                continue;
            }
            report.invoked += 1;
            if let Err(err) = dispatcher.dispatch(self, handler, &payload) {
                report.failed += 1;
                warn!(event = %kind, %handler, error = %err, "event handler failed");
            }
        }
        self.dispatching.remove(kind);

        report.merge(self.drain_deferred(dispatcher));
        report
    }

    fn drain_deferred<D>(&mut self, dispatcher: &mut D) -> DispatchReport
    where
        D: Dispatch + ?Sized,
    {
        let mut report = DispatchReport::default();
        while self
            .deferred
            .front()
            .is_some_and(|next| !next.blocked_by(self.dispatching))
        {
            match self.deferred.pop_front() {
                Some(Queued::Event(payload)) => report.merge(self.emit(payload, dispatcher)),
                Some(Queued::Defeat(who)) => dispatcher.settle_defeat(self, who),
                None => break,
            }
        }
        report
    }
}

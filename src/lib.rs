//! # zzpassive - Deterministic Stat-Effect & Passive-Trigger Engine
//!
//! The runtime behind a turn-based combat system's stats and passives:
//! - **Stat blocks**: base attributes plus named, sourced, timed modifiers,
//!   summed and clamped on read
//! - **Closed event vocabulary**: combat lifecycle events as a tagged union
//! - **Passives**: behaviors that react to events, stack, decay and clean
//!   up after themselves
//! - **Per-battle isolation**: every battle owns its bus, roster and
//!   passive instances
//!
//! ## Core Concepts
//!
//! ### Effective values
//!
//! ```text
//! get(attr) = clamp(base(attr) + Σ deltas of active modifiers naming attr)
//! ```
//!
//! Modifiers are replaced by name, removed by name or by source, and tick
//! down once per owner turn end.
//!
//! ### Event flow
//!
//! ```text
//! Battle driver → EventBus → passive handlers → side effects → CombatResolver
//!                    ↑                                             │
//!                    └──────── hit_landed / critical_hit ──────────┘
//! ```
//!
//! Handlers for one event run in subscription order, each to completion.
//! Damage a handler requests with `trigger_on_hit = false` never raises
//! another hit event, and an event kind never re-enters itself.
//!
//! ## Example
//!
//! ```rust
//! use zzpassive::*;
//! use zzpassive::attribute::names;
//!
//! let mut stats = StatBlock::new().with_base(names::MITIGATION, 1.0);
//! stats.add(Modifier::lasting("brace", "guard", 1).with_delta(names::MITIGATION, 0.2));
//! stats.add(Modifier::permanent("sundered", "armor_break").with_delta(names::MITIGATION, -0.05));
//!
//! assert!((stats.get(names::MITIGATION) - 1.15).abs() < 1e-9);
//! stats.tick();
//! assert!((stats.get(names::MITIGATION) - 0.95).abs() < 1e-9);
//! ```
//!
//! ## Modules
//!
//! - [`attribute`] - Attribute ids and clamp bounds
//! - [`modifier`] - Modifiers and lifetimes
//! - [`stat_block`] - Effective attribute computation
//! - [`resolved`] - Per-attribute breakdowns
//! - [`metadata`] - Event metadata
//! - [`event`] - Event vocabulary
//! - [`bus`] - Subscription registry and dispatch
//! - [`combatant`] - Combatants, handles and the roster arena
//! - [`effects`] - Side effects and the combat-resolution boundary
//! - [`context`] - What a running passive can see and do
//! - [`passive`] - The passive trait and the built-in catalogue
//! - [`registry`] - Passive id → factory table
//! - [`battle`] - Per-battle driver
//! - [`config`] - Setup documents
//! - [`error`] - Error types

pub mod attribute;
pub mod battle;
pub mod bus;
pub mod combatant;
pub mod config;
pub mod context;
pub mod effects;
pub mod error;
pub mod event;
pub mod metadata;
pub mod modifier;
pub mod passive;
pub mod registry;
pub mod resolved;
pub mod stat_block;

// Re-export main types for convenience
pub use attribute::{AttributeId, Bounds};
pub use battle::Battle;
pub use bus::{Dispatch, DispatchReport, EventBus, HandlerId};
pub use combatant::{Combatant, CombatantHandle, Roster, Team};
pub use config::{BattleSetup, CombatantSpec};
pub use context::TriggerContext;
pub use effects::{
    CombatResolver, DamageOutcome, DamageRequest, HealKind, HealRequest, SideEffect,
    SimpleResolver,
};
pub use error::EngineError;
pub use event::{BattleEvent, EventKind, EventPayload, TriggerSet};
pub use metadata::Metadata;
pub use modifier::{Lifetime, Modifier};
pub use passive::{Passive, StateMap};
pub use registry::PassiveRegistry;
pub use resolved::ResolvedStat;
pub use stat_block::StatBlock;

//! Side effects and the combat-resolution boundary.
//!
//! Passives never change HP themselves. They queue [`SideEffect`]s, and
//! the battle hands each one to a [`CombatResolver`] supplied by the
//! battle driver. Damage requests carry an explicit `trigger_on_hit`
//! flag: secondary damage dealt from inside a hit handler sets it to
//! `false` so it cannot raise another `hit_landed`.

use crate::attribute::names;
use crate::combatant::{Combatant, CombatantHandle, Roster};
use serde::{Deserialize, Serialize};

/// Category of incoming healing, checked against heal guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealKind {
    Direct,
    OverTime,
    Siphon,
}

/// A request to damage a combatant.
///
/// # Examples
///
/// ```rust
/// use zzpassive::{Combatant, DamageRequest, Roster, Team};
///
/// let mut roster = Roster::new();
/// let a = roster.insert(Combatant::new("a", Team::Party));
/// let b = roster.insert(Combatant::new("b", Team::Foes));
///
/// let echo = DamageRequest::new(50.0, a, b, false, "echo").critical(false);
/// assert!(!echo.trigger_on_hit);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DamageRequest {
    /// Raw amount before the target's mitigation.
    pub amount: f64,
    /// Dealer.
    pub attacker: CombatantHandle,
    /// Receiver.
    pub target: CombatantHandle,
    /// Whether resolving this may emit `hit_landed` / `critical_hit`.
    pub trigger_on_hit: bool,
    /// Name of the action or passive that caused it.
    pub action: String,
    /// Whether the hit is critical.
    pub critical: bool,
}

impl DamageRequest {
    /// Build a non-critical damage request.
    pub fn new(
        amount: f64,
        attacker: CombatantHandle,
        target: CombatantHandle,
        trigger_on_hit: bool,
        action: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            attacker,
            target,
            trigger_on_hit,
            action: action.into(),
            critical: false,
        }
    }

    /// Set whether the hit is critical.
    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }
}

/// A request to heal a combatant.
#[derive(Debug, Clone, PartialEq)]
pub struct HealRequest {
    /// Raw amount before the healer's vitality.
    pub amount: f64,
    /// Who heals.
    pub healer: CombatantHandle,
    /// Who is healed.
    pub target: CombatantHandle,
    /// Category, checked against the target's heal guards.
    pub source_type: HealKind,
    /// Name of the passive or effect that heals.
    pub source_name: String,
}

impl HealRequest {
    pub fn new(
        amount: f64,
        healer: CombatantHandle,
        target: CombatantHandle,
        source_type: HealKind,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            healer,
            target,
            source_type,
            source_name: source_name.into(),
        }
    }
}

/// Something a passive asked the battle to do on its behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Damage(DamageRequest),
    Heal(HealRequest),
    UltimateCharge {
        target: CombatantHandle,
        amount: u32,
    },
}

/// What resolving a damage request did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamageOutcome {
    /// HP actually removed.
    pub dealt: f64,
    /// Whether the hit was critical.
    pub critical: bool,
    /// Whether this hit took the target from alive to dead.
    pub defeated: bool,
}

/// Damage, healing and charge resolution, owned by the battle driver.
///
/// The engine calls into this; it never touches HP itself.
pub trait CombatResolver {
    /// Apply a damage request to the roster.
    fn apply_damage(&mut self, roster: &mut Roster, request: &DamageRequest) -> DamageOutcome;

    /// Apply a heal request. Returns the HP actually restored.
    fn apply_healing(&mut self, roster: &mut Roster, request: &HealRequest) -> f64;

    /// Add ultimate charge.
    fn add_ultimate_charge(&mut self, roster: &mut Roster, target: CombatantHandle, amount: u32);
}

/// Straightforward deterministic resolver.
///
/// - damage = `amount × crit_damage (if critical) ÷ mitigation`;
/// - healing = `amount × healer vitality`, capped at max HP, refused by heal guards;
/// - ultimate charge saturates at [`Combatant::MAX_ULTIMATE_CHARGE`].
///
/// Dead combatants take no damage and receive no healing.
#[derive(Debug, Clone, Default)]
pub struct SimpleResolver {
    /// Every damage request seen, in order.
    pub damage_log: Vec<DamageRequest>,
    /// Every heal request seen, in order.
    pub heal_log: Vec<HealRequest>,
}

impl SimpleResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CombatResolver for SimpleResolver {
    fn apply_damage(&mut self, roster: &mut Roster, request: &DamageRequest) -> DamageOutcome {
        self.damage_log.push(request.clone());
        let crit_multiplier = if request.critical {
            roster
                .get(request.attacker)
                .map(|c| c.stats.get(names::CRIT_DAMAGE))
                .unwrap_or(1.0)
        } else {
            1.0
        };
        let Some(target) = roster.get_mut(request.target) else {
            return DamageOutcome::default();
        };
        if !target.is_alive() {
            return DamageOutcome::default();
        }
        let mitigation = target.stats.get(names::MITIGATION);
        let dealt = (request.amount.max(0.0) * crit_multiplier / mitigation).min(target.hp);
        target.hp -= dealt;
        DamageOutcome {
            dealt,
            critical: request.critical,
            defeated: !target.is_alive(),
        }
    }

    fn apply_healing(&mut self, roster: &mut Roster, request: &HealRequest) -> f64 {
        self.heal_log.push(request.clone());
        let vitality = roster
            .get(request.healer)
            .map(|c| c.stats.get(names::VITALITY))
            .unwrap_or(1.0);
        let Some(target) = roster.get_mut(request.target) else {
            return 0.0;
        };
        if !target.is_alive() || !target.accepts_healing(request.source_type) {
            return 0.0;
        }
        let missing = (target.max_hp() - target.hp).max(0.0);
        let healed = (request.amount.max(0.0) * vitality).min(missing);
        target.hp += healed;
        healed
    }

    fn add_ultimate_charge(&mut self, roster: &mut Roster, target: CombatantHandle, amount: u32) {
        if let Some(c) = roster.get_mut(target) {
            c.ultimate_charge = c
                .ultimate_charge
                .saturating_add(amount)
                .min(Combatant::MAX_ULTIMATE_CHARGE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Team;
    use crate::modifier::Modifier;

    fn roster() -> (Roster, CombatantHandle, CombatantHandle) {
        let mut roster = Roster::new();
        let a = roster.insert(Combatant::new("a", Team::Party));
        let b = roster.insert(Combatant::new("b", Team::Foes));
        (roster, a, b)
    }

    #[test]
    fn test_damage_divides_by_mitigation() {
        let (mut roster, a, b) = roster();
        roster
            .get_mut(b)
            .unwrap()
            .stats
            .add(Modifier::permanent("brace", "test").with_delta(names::MITIGATION, 1.0));
        let mut resolver = SimpleResolver::new();
        let out = resolver.apply_damage(&mut roster, &DamageRequest::new(100.0, a, b, true, "hit"));
        assert_eq!(out.dealt, 50.0);
        assert_eq!(roster.get(b).unwrap().hp, 950.0);
        assert!(!out.defeated);
    }

    #[test]
    fn test_critical_uses_attacker_crit_damage() {
        let (mut roster, a, b) = roster();
        let mut resolver = SimpleResolver::new();
        let out = resolver.apply_damage(
            &mut roster,
            &DamageRequest::new(100.0, a, b, true, "hit").critical(true),
        );
        assert_eq!(out.dealt, 200.0);
        assert!(out.critical);
    }

    #[test]
    fn test_lethal_damage_reports_defeat_once() {
        let (mut roster, a, b) = roster();
        let mut resolver = SimpleResolver::new();
        let first = resolver.apply_damage(&mut roster, &DamageRequest::new(5000.0, a, b, true, "hit"));
        assert!(first.defeated);
        assert_eq!(first.dealt, 1000.0);
        let second = resolver.apply_damage(&mut roster, &DamageRequest::new(10.0, a, b, true, "hit"));
        assert!(!second.defeated);
        assert_eq!(second.dealt, 0.0);
    }

    #[test]
    fn test_healing_respects_guards_and_cap() {
        let (mut roster, a, b) = roster();
        roster.get_mut(b).unwrap().hp = 900.0;
        let mut resolver = SimpleResolver::new();

        let healed = resolver.apply_healing(
            &mut roster,
            &HealRequest::new(500.0, a, b, HealKind::Direct, "test"),
        );
        assert_eq!(healed, 100.0);

        roster.get_mut(b).unwrap().hp = 900.0;
        roster.get_mut(b).unwrap().block_healing("g", HealKind::OverTime);
        let blocked = resolver.apply_healing(
            &mut roster,
            &HealRequest::new(50.0, a, b, HealKind::OverTime, "regen"),
        );
        assert_eq!(blocked, 0.0);
        assert_eq!(resolver.heal_log.len(), 2);
    }

    #[test]
    fn test_ultimate_charge_saturates() {
        let (mut roster, a, _) = roster();
        let mut resolver = SimpleResolver::new();
        resolver.add_ultimate_charge(&mut roster, a, 70);
        resolver.add_ultimate_charge(&mut roster, a, 70);
        assert_eq!(roster.get(a).unwrap().ultimate_charge, Combatant::MAX_ULTIMATE_CHARGE);
    }
}

use proptest::prelude::*;
use zzpassive::attribute::names;
use zzpassive::passive::{
    LunarPhase, MirrorWard, StackCounter, StalwartWill, StanceConfig, VampiricSiphon,
};
use zzpassive::*;

/// A hero carrying `passives` against one plain foe.
fn duel(passives: &[&str]) -> (Battle, CombatantHandle, CombatantHandle) {
    let registry = PassiveRegistry::builtin();
    let mut battle: Battle = Battle::default();
    let hero = battle.prepare(Combatant::new("hero", Team::Party), passives, &registry);
    let foe = battle.add_combatant(Combatant::new("foe", Team::Foes));
    battle.start();
    (battle, hero, foe)
}

fn stat(battle: &Battle, who: CombatantHandle, attr: &str) -> f64 {
    battle.combatant(who).map_or(f64::NAN, |c| c.stats.get(attr))
}

/// Three landed hits turn the stance on; two turn ends take it back off.
#[test]
fn test_berserker_momentum_activation_and_decay() {
    let (mut battle, hero, foe) = duel(&["berserker_momentum"]);
    let threshold = StanceConfig::BERSERKER_MOMENTUM.threshold;

    for _ in 0..threshold {
        battle.perform_attack(hero, foe, 10.0, false);
    }
    assert_eq!(battle.stacks(hero, "berserker_momentum"), Some(3));
    assert_eq!(stat(&battle, hero, names::ATTACK), 130.0);
    assert!((stat(&battle, hero, names::CRIT_RATE) - 0.15).abs() < 1e-9);

    battle.end_turn(hero);
    battle.end_turn(hero);
    assert_eq!(battle.stacks(hero, "berserker_momentum"), Some(1));
    assert_eq!(stat(&battle, hero, names::ATTACK), 100.0);
}

#[test]
fn test_berserker_momentum_caps_at_max() {
    let (mut battle, hero, foe) = duel(&["berserker_momentum"]);
    for _ in 0..12 {
        battle.perform_attack(hero, foe, 1.0, false);
    }
    assert_eq!(
        battle.stacks(hero, "berserker_momentum"),
        Some(StanceConfig::BERSERKER_MOMENTUM.max_stacks)
    );
    // Bonus is applied once, not per stack.
    assert_eq!(stat(&battle, hero, names::ATTACK), 130.0);
}

/// Missed and zero-damage hits never feed the stance.
#[test]
fn test_zero_damage_hit_does_not_count() {
    let (mut battle, hero, foe) = duel(&["berserker_momentum"]);
    battle.perform_attack(hero, foe, 0.0, false);
    assert_eq!(battle.stacks(hero, "berserker_momentum"), None);
}

#[test]
fn test_iron_resolve_stores_enemy_crits() {
    let (mut battle, hero, foe) = duel(&["iron_resolve"]);

    // 2 stacks per hit below the soft cap.
    for _ in 0..5 {
        battle.perform_attack(foe, hero, 10.0, false);
    }
    assert_eq!(battle.stacks(hero, "iron_resolve"), Some(10));
    assert!((stat(&battle, hero, names::MITIGATION) - 1.3).abs() < 1e-9);
    assert_eq!(stat(&battle, hero, names::DEFENSE), 90.0);

    // Past the soft cap each hit adds 1.
    battle.perform_attack(foe, hero, 10.0, true);
    battle.perform_attack(foe, hero, 10.0, true);
    assert_eq!(battle.stacks(hero, "iron_resolve"), Some(12));

    for _ in 0..3 {
        battle.end_turn(hero);
    }
    assert_eq!(battle.stacks(hero, "iron_resolve"), Some(9));
    assert!((stat(&battle, hero, names::MITIGATION) - 1.0).abs() < 1e-9);
    assert_eq!(battle.combatant(hero).unwrap().ultimate_charge, 10);
}

#[test]
fn test_iron_resolve_blocks_healing_over_time_only() {
    let (mut battle, hero, foe) = duel(&["iron_resolve"]);
    for _ in 0..5 {
        battle.perform_attack(foe, hero, 100.0, false);
    }
    let hp = battle.combatant(hero).unwrap().hp;

    battle.request(SideEffect::Heal(HealRequest::new(
        50.0,
        hero,
        hero,
        HealKind::OverTime,
        "regen",
    )));
    assert_eq!(battle.combatant(hero).unwrap().hp, hp);

    battle.request(SideEffect::Heal(HealRequest::new(
        50.0,
        hero,
        hero,
        HealKind::Direct,
        "potion",
    )));
    assert_eq!(battle.combatant(hero).unwrap().hp, hp + 50.0);
}

#[test]
fn test_tidal_focus_decays_with_damage_taken() {
    let (mut battle, hero, foe) = duel(&["tidal_focus"]);
    battle.begin_turn(hero);
    battle.begin_turn(hero);
    assert_eq!(battle.stacks(hero, "tidal_focus"), Some(2));
    assert_eq!(stat(&battle, hero, names::SPEED), 110.0);

    // 250 damage costs two stacks.
    battle.perform_attack(foe, hero, 250.0, false);
    assert_eq!(battle.stacks(hero, "tidal_focus"), Some(0));
    assert_eq!(stat(&battle, hero, names::SPEED), 100.0);
}

#[test]
fn test_foe_turns_do_not_feed_owner_stances() {
    let (mut battle, hero, foe) = duel(&["tidal_focus"]);
    battle.begin_turn(foe);
    battle.end_turn(foe);
    assert_eq!(battle.stacks(hero, "tidal_focus"), None);
}

#[test]
fn test_lunar_cycle_phases() {
    let (mut battle, hero, _foe) = duel(&["lunar_cycle"]);

    battle.begin_turn(hero);
    assert_eq!(battle.stacks(hero, "lunar_cycle"), Some(LunarPhase::New.ordinal()));
    assert_eq!(stat(&battle, hero, names::DEFENSE), 70.0);

    battle.begin_turn(hero);
    assert_eq!(stat(&battle, hero, names::ATTACK), 115.0);
    assert_eq!(stat(&battle, hero, names::DEFENSE), 50.0);

    battle.begin_turn(hero);
    battle.begin_turn(hero);
    assert_eq!(battle.stacks(hero, "lunar_cycle"), Some(LunarPhase::Waning.ordinal()));
    battle.begin_turn(hero);
    assert_eq!(battle.stacks(hero, "lunar_cycle"), Some(LunarPhase::New.ordinal()));

    // One phase modifier at a time.
    assert_eq!(battle.combatant(hero).unwrap().stats.len(), 1);
}

#[test]
fn test_vampiric_siphon_drains_and_heals() {
    let (mut battle, hero, foe) = duel(&["vampiric_siphon"]);
    battle.combatant_mut(hero).unwrap().hp = 500.0;

    battle.perform_attack(hero, foe, 100.0, false);
    battle.perform_attack(hero, foe, 100.0, false);

    assert_eq!(battle.combatant(hero).unwrap().hp, 540.0);
    assert_eq!(battle.stacks_for(hero, VampiricSiphon::ID, foe), Some(2));
    assert_eq!(stat(&battle, foe, names::ATTACK), 90.0);
    assert_eq!(stat(&battle, hero, names::ATTACK), 110.0);

    battle.end(Some(Team::Party));
    assert_eq!(stat(&battle, foe, names::ATTACK), 100.0);
    assert_eq!(stat(&battle, hero, names::ATTACK), 100.0);
}

/// Removing the drained foe gives the owner's feast back.
#[test]
fn test_vampiric_siphon_forgets_removed_foe() {
    let (mut battle, hero, foe) = duel(&["vampiric_siphon"]);
    battle.perform_attack(hero, foe, 100.0, false);
    assert_eq!(stat(&battle, hero, names::ATTACK), 105.0);

    battle.remove_combatant(foe);
    assert!(battle.tracked_by(hero, VampiricSiphon::ID).is_empty());
    assert_eq!(stat(&battle, hero, names::ATTACK), 100.0);
}

#[test]
fn test_mirror_ward_runs_out_of_charges() {
    let (mut battle, hero, foe) = duel(&["mirror_ward"]);
    assert_eq!(battle.stacks(hero, MirrorWard::ID), Some(MirrorWard::MAX_CHARGES));

    for _ in 0..4 {
        battle.perform_attack(foe, hero, 100.0, false);
    }
    assert_eq!(battle.stacks(hero, MirrorWard::ID), Some(0));
    // Three reflections of 25 each.
    assert_eq!(battle.combatant(foe).unwrap().hp, 925.0);

    battle.begin_turn(hero);
    assert_eq!(battle.stacks(hero, MirrorWard::ID), Some(1));
}

#[test]
fn test_stalwart_will_ignores_ally_buffs() {
    let registry = PassiveRegistry::builtin();
    let mut battle: Battle = Battle::default();
    let hero = battle.prepare(Combatant::new("hero", Team::Party), &["stalwart_will"], &registry);
    let friend = battle.add_combatant(Combatant::new("friend", Team::Party));
    let foe = battle.add_combatant(Combatant::new("foe", Team::Foes));

    for _ in 0..2 {
        battle.emit(BattleEvent::EffectResisted {
            target: hero,
            source: Some(foe),
            effect: "freeze".into(),
        });
    }
    assert_eq!(battle.stacks(hero, StalwartWill::ID), Some(2));
    assert!((stat(&battle, hero, names::EFFECT_RESISTANCE) - 0.15).abs() < 1e-9);

    battle.emit(BattleEvent::EffectApplied {
        target: hero,
        source: Some(friend),
        effect: "haste".into(),
    });
    assert_eq!(battle.stacks(hero, StalwartWill::ID), Some(2));

    battle.emit(BattleEvent::EffectApplied {
        target: hero,
        source: Some(foe),
        effect: "burn".into(),
    });
    assert_eq!(battle.stacks(hero, StalwartWill::ID), Some(1));
}

#[test]
fn test_purifying_light_rewards_cleanser() {
    let registry = PassiveRegistry::builtin();
    let mut battle: Battle = Battle::default();
    let healer = battle.prepare(Combatant::new("healer", Team::Party), &["purifying_light"], &registry);
    let friend = battle.add_combatant(Combatant::new("friend", Team::Party));
    battle.combatant_mut(friend).unwrap().hp = 500.0;

    battle.emit(BattleEvent::DotCleansed {
        target: friend,
        cleanser: Some(healer),
        effect: "poison".into(),
    });
    assert_eq!(battle.combatant(friend).unwrap().hp, 550.0);
    assert_eq!(battle.combatant(healer).unwrap().ultimate_charge, 5);

    // Someone else's cleanse is not ours.
    battle.emit(BattleEvent::DotCleansed {
        target: friend,
        cleanser: None,
        effect: "poison".into(),
    });
    assert_eq!(battle.combatant(healer).unwrap().ultimate_charge, 5);
}

#[test]
fn test_defeat_clears_state() {
    let (mut battle, hero, foe) = duel(&["berserker_momentum"]);
    for _ in 0..3 {
        battle.perform_attack(hero, foe, 10.0, false);
    }
    assert_eq!(battle.tracked_by(hero, "berserker_momentum"), vec![hero]);

    battle.perform_attack(foe, hero, 5000.0, false);
    assert!(!battle.combatant(hero).unwrap().is_alive());
    assert!(battle.tracked_by(hero, "berserker_momentum").is_empty());
    assert_eq!(stat(&battle, hero, names::ATTACK), 100.0);
}

#[test]
fn test_fresh_instances_per_battle() {
    let (mut first, hero, foe) = duel(&["berserker_momentum"]);
    for _ in 0..3 {
        first.perform_attack(hero, foe, 10.0, false);
    }
    let (second, hero2, _) = duel(&["berserker_momentum"]);
    assert_eq!(second.stacks(hero2, "berserker_momentum"), None);
    assert_eq!(first.stacks(hero, "berserker_momentum"), Some(3));
}

proptest! {
    #[test]
    fn prop_stack_counter_stays_in_range(
        max in 0u32..50,
        ops in prop::collection::vec((any::<bool>(), 0u32..100), 0..80),
    ) {
        let mut counter = StackCounter::new(max);
        for (gain, n) in ops {
            let value = if gain { counter.gain(n) } else { counter.decay(n) };
            prop_assert_eq!(value, counter.value());
            prop_assert!(counter.value() <= max);
        }
    }

    #[test]
    fn prop_berserker_stacks_within_bounds(
        moves in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let (mut battle, hero, foe) = duel(&["berserker_momentum"]);
        let config = StanceConfig::BERSERKER_MOMENTUM;
        for attack in moves {
            if attack {
                battle.perform_attack(hero, foe, 1.0, false);
            } else {
                battle.end_turn(hero);
            }
            let stacks = battle.stacks(hero, config.id).unwrap_or(0);
            prop_assert!(stacks <= config.max_stacks);
            let active = stacks >= config.threshold;
            let expected = if active { 130.0 } else { 100.0 };
            prop_assert_eq!(stat(&battle, hero, names::ATTACK), expected);
        }
    }
}

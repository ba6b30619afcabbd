//! Skirmish example: a small battle built from a setup document
//!
//! This example demonstrates:
//! - Loading combatants and their passives from JSON
//! - Driving turns and attacks
//! - Watching passive stacks and stats change

use zzpassive::attribute::names;
use zzpassive::registry::PassiveRegistry;
use zzpassive::*;

const SETUP: &str = r#"{
    "combatants": [
        {
            "name": "Ayla",
            "team": "party",
            "base": { "atk": 120 },
            "passives": ["berserker_momentum", "echo_strike"]
        },
        {
            "name": "Bram",
            "team": "party",
            "passives": ["guardian_bond", "not_a_passive"]
        },
        {
            "name": "Slime",
            "team": "foes",
            "hp": 400,
            "passives": ["mirror_ward"]
        }
    ]
}"#;

fn main() -> Result<(), EngineError> {
    let setup = BattleSetup::from_json(SETUP)?;
    let registry = PassiveRegistry::builtin();
    let (mut battle, handles) = Battle::from_setup(&setup, &registry, SimpleResolver::new());

    println!("=== Combatants ===");
    for &who in &handles {
        if let Some(c) = battle.combatant(who) {
            println!("{} ({}): {:?}", c.name, who, battle.passive_ids(who));
        }
    }

    battle.start();
    for round in 1..=5u32 {
        println!("\n=== Round {} ===", round);
        for &actor in &handles {
            let Some(attacker) = battle.combatant(actor) else {
                continue;
            };
            if !attacker.is_alive() {
                continue;
            }
            let team = attacker.team;
            let target = handles.iter().copied().find(|&h| {
                battle
                    .combatant(h)
                    .is_some_and(|c| c.team != team && c.is_alive())
            });
            let Some(target) = target else {
                continue;
            };

            battle.begin_turn(actor);
            let outcome = battle.perform_attack(actor, target, 40.0, round % 3 == 0);
            battle.end_turn(actor);
            println!(
                "  {} -> {}: {:.1}{}",
                actor,
                target,
                outcome.dealt,
                if outcome.critical { " (crit)" } else { "" }
            );
        }

        for &who in &handles {
            if let Some(c) = battle.combatant(who) {
                println!(
                    "  {:>6}: hp {:>7.1}  atk {:>6.1}  momentum {:?}",
                    c.name,
                    c.hp,
                    c.stats.get(names::ATTACK),
                    battle.stacks(who, "berserker_momentum"),
                );
            }
        }
    }

    battle.end(Some(Team::Party));
    println!("\n=== After battle ===");
    for &who in &handles {
        if let Some(c) = battle.combatant(who) {
            println!("  {}: atk {:.1}", c.name, c.stats.get(names::ATTACK));
        }
    }

    Ok(())
}

//! Basic example: a stat block with timed and permanent modifiers
//!
//! This example demonstrates:
//! - Setting base attributes
//! - Adding, replacing and removing modifiers
//! - Ticking lifetimes and reading breakdowns

use zzpassive::attribute::names;
use zzpassive::*;

fn main() -> Result<(), EngineError> {
    // Base attributes
    let mut stats = StatBlock::new()
        .with_base(names::ATTACK, 100.0)
        .with_base(names::MITIGATION, 1.0);
    println!("Base ATK: {:.2}", stats.get(names::ATTACK));

    // Timed buff, permanent curse
    println!("\nAdding modifiers:");
    let rally = Modifier::lasting("rally", "banner", 2).with_delta(names::ATTACK, 25.0);
    rally.validate()?;
    stats.add(rally);
    println!("  - rally: +25 ATK for 2 ticks");

    stats.add(Modifier::permanent("sundered", "armor_break").with_delta(names::MITIGATION, -0.95));
    println!("  - sundered: -0.95 mitigation, permanent");

    // Re-adding under the same name replaces
    stats.add(Modifier::lasting("rally", "banner", 2).with_delta(names::ATTACK, 40.0));
    println!("  - rally again: +40 ATK replaces +25");

    println!("\n=== Resolved Stats ===");
    print_breakdown(&stats.breakdown(names::ATTACK));
    print_breakdown(&stats.breakdown(names::MITIGATION));

    println!("\nTicking twice...");
    for _ in 0..2 {
        for name in stats.tick() {
            println!("  expired: {}", name);
        }
    }
    println!("ATK after ticks: {:.2}", stats.get(names::ATTACK));

    let removed = stats.remove_by_source("armor_break");
    println!("Removed {} modifier(s) from armor_break", removed);
    println!("Mitigation now: {:.2}", stats.get(names::MITIGATION));

    Ok(())
}

fn print_breakdown(resolved: &ResolvedStat) {
    println!("\n{}:", resolved.attribute);
    println!("  base: {:.2}", resolved.base);
    for (name, delta) in &resolved.contributions {
        println!("  {}: {:+.2}", name, delta);
    }
    if resolved.is_clamped() {
        println!("  clamped from {:.2}", resolved.unclamped);
    }
    println!("  final: {:.2}", resolved.value);
}

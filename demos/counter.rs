//! Counter Machine
//!
//! This example walks a single cursor around three states driven by one
//! global counter.
//!
//! Key concepts:
//! - Conditions evaluated in declaration order, first match wins
//! - Actions attached to a specific rule
//! - Edge actions on LEAVE and ENTER
//! - Transition history
//!
//! Run with: cargo run --example counter

use scenery::core::HookFns;
use scenery::record;
use scenery::rules::{Edge, RuleTable};
use scenery::runtime::Cursor;
use scenery::store::Access;
use std::rc::Rc;

record! {
    struct CounterData {
        num: i64 = 0 => Access::global(),
        visits: i64 = 0 => Access::transient(["Second"]),
    }
}

fn main() -> scenery::Result<()> {
    println!("=== Counter Machine ===\n");

    let mut table = RuleTable::new();
    let bump = |cursor: &mut Cursor, _: &mut scenery::Context| cursor.view().modify("num", |n: i64| n + 1);

    let entry = table.declare_state("Entry", HookFns::new().on_update(bump))?;
    let second = table.declare_state(
        "Second",
        HookFns::new()
            .on_update(bump)
            .on_enter(|cursor, from, _| {
                let from = from.map_or("nowhere", |s| s.name());
                println!("  entered Second from {from}, num = {}", cursor.view().get::<i64>("num")?);
                Ok(())
            }),
    )?;

    let is_one = table.add_condition(entry, second, |_, cursor, _| {
        Ok(cursor.view().get::<i64>("num")? == 1)
    })?;
    let is_three = table.add_condition(entry, second, |_, cursor, _| {
        Ok(cursor.view().get::<i64>("num")? == 3)
    })?;
    table.add_rule_action(is_one, |_, _, _, _| {
        println!("  first pass through Entry");
        Ok(())
    })?;
    table.add_rule_action(is_three, |_, _, _, _| {
        println!("  second pass through Entry");
        Ok(())
    })?;

    table.add_condition(second, entry, |_, cursor, _| {
        Ok(cursor.view().get::<i64>("num")? == 2)
    })?;
    table.add_condition(second, "Third", |_, cursor, _| {
        Ok(cursor.view().get::<i64>("num")? == 4)
    })?;
    table.add_action(entry, second, Edge::Enter, |_, _, cursor, _| {
        cursor.view().modify("visits", |v: i64| v + 1)
    })?;
    table.add_action(second, "Third", Edge::Leave, |_, _, cursor, _| {
        println!("  leaving Second with visits = {}", cursor.view().get::<i64>("visits")?);
        Ok(())
    })?;
    let third = table.declare("Third")?;
    table.finalize()?;

    let mut cursor = Cursor::new::<CounterData>("counter", Rc::new(table), entry)?;
    println!("Initial state: {}\n", cursor.state());

    while cursor.state() != third {
        cursor.tick()?;
        println!("tick {}: {}", cursor.ticks(), cursor.state());
    }

    let path: Vec<String> = cursor.history().path().iter().map(ToString::to_string).collect();
    println!("\nPath: {}", path.join(" -> "));

    println!("\n=== Example Complete ===");
    Ok(())
}

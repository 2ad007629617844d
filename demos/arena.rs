//! Arena
//!
//! This example runs a small scripted game: an arena machine cycling through
//! Play, Death and Leaderboard, driving one child machine per enemy.
//!
//! Key concepts:
//! - Nested cursors sharing a context
//! - Children spawned from a hook and updated in the same tick
//! - Transient fields with factories reading the parent's data
//! - Wildcard edge actions
//! - Driving a root cursor with `Cursor::run`
//!
//! Run with: RUST_LOG=scenery=debug cargo run --example arena

use scenery::core::HookFns;
use scenery::record;
use scenery::rules::{Edge, Endpoint, RuleTable};
use scenery::runtime::Cursor;
use scenery::store::Access;
use scenery::StateId;
use std::ops::ControlFlow;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

record! {
    struct ArenaData {
        score: i64 = 0 => Access::transient(["Play"]),
        health: i64 = 6 => Access::transient(["Play"]),
        wave: i64 = 0 => Access::transient(["Play"]),
        lives: i64 = 3 => Access::static_in(["Play", "Death", "Leaderboard"]),
        leaderboard: Vec<i64> = Vec::new() => Access::global(),
    }
}

record! {
    struct EnemyData {
        hp: i64 = 0 => Access::transient_with(["Alive"], |_, _, ctx| Ok(ctx.get::<i64>("wave")? + 1)),
    }
}

fn enemy_table() -> scenery::Result<(Rc<RuleTable>, StateId, StateId)> {
    let mut table = RuleTable::new();
    let alive = table.declare_state(
        "Alive",
        HookFns::new().on_update(|cursor, ctx| {
            cursor.view().modify("hp", |hp: i64| hp - 1)?;
            // hp is local, health belongs to the arena
            ctx.modify("health", |h: i64| h - 1)
        }),
    )?;
    let dead = table.declare("Dead")?;
    table.add_condition(alive, dead, |_, cursor, _| Ok(cursor.view().get::<i64>("hp")? <= 0))?;
    table.finalize()?;
    Ok((Rc::new(table), alive, dead))
}

fn arena_table() -> scenery::Result<(RuleTable, StateId)> {
    let (enemies, alive, dead) = enemy_table()?;
    let mut table = RuleTable::new();

    let play = table.declare_state(
        "Play",
        HookFns::new()
            .on_update(move |cursor, ctx| {
                cursor.retain_children(|enemy| enemy.state() != dead);
                cursor.view().modify("score", |s: i64| s + 10)?;
                if cursor.ticks() % 3 == 0 {
                    cursor.view().modify("wave", |w: i64| w + 1)?;
                    let key = format!("enemy-{}", cursor.ticks());
                    let enemy = Cursor::new_in::<EnemyData>(&key, Rc::clone(&enemies), alive, ctx)?;
                    cursor.push_child(enemy);
                }
                Ok(())
            })
            .on_leave(|cursor, _, _| {
                cursor.retain_children(|_| false);
                Ok(())
            }),
    )?;
    let death = table.declare_state(
        "Death",
        HookFns::new().on_enter(|cursor, _, _| {
            println!("  you died, {} lives left", cursor.view().get::<i64>("lives")?);
            Ok(())
        }),
    )?;
    let board = table.declare_state(
        "Leaderboard",
        HookFns::new().on_enter(|cursor, _, _| {
            let scores: Vec<i64> = cursor.view().get("leaderboard")?;
            println!("  leaderboard: {scores:?}");
            Ok(())
        }),
    )?;

    table.add_condition(play, death, |_, cursor, _| Ok(cursor.view().get::<i64>("health")? <= 0))?;
    table.add_condition(death, board, |_, _, _| Ok(true))?;
    table.add_condition(board, play, |_, cursor, _| Ok(cursor.view().get::<i64>("lives")? > 0))?;

    // Scores are read before Play's transients reset.
    table.add_action(play, Endpoint::Any, Edge::Leave, |from, _, cursor, _| {
        let score: i64 = cursor.view_as(from).get("score")?;
        cursor.view().modify("leaderboard", |mut scores: Vec<i64>| {
            scores.push(score);
            scores.sort_unstable_by(|a, b| b.cmp(a));
            scores
        })
    })?;
    table.add_action(Endpoint::Any, death, Edge::Enter, |_, _, cursor, _| {
        cursor.view().modify("lives", |l: i64| l - 1)
    })?;

    table.finalize()?;
    Ok((table, play))
}

fn main() -> scenery::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Arena ===\n");

    let (table, play) = arena_table()?;
    let board = table.state_named("Leaderboard");
    let mut game = Cursor::new::<ArenaData>("arena", Rc::new(table), play)?;

    game.run(|game| {
        let health = game.view_as(play).get::<i64>("health")?;
        println!(
            "tick {:>2}: {:<11} health {:>2}, {} enemies",
            game.ticks(),
            game.state().name(),
            health,
            game.children().len()
        );

        let out_of_lives = matches!(game.view().get::<i64>("lives"), Ok(0));
        if (Some(game.state()) == board && out_of_lives) || game.ticks() >= 200 {
            Ok(ControlFlow::Break(()))
        } else {
            Ok(ControlFlow::Continue(()))
        }
    })?;

    let scores: Vec<i64> = game.view().get("leaderboard")?;
    println!("\nFinal leaderboard: {scores:?}");
    println!("Transitions: {}", game.history().len());

    println!("\n=== Example Complete ===");
    Ok(())
}
